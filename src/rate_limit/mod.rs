//! Per-IP token bucket rate limiting for the `/detect/*` routes.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: u32,
    window_start: Instant,
}

/// Fixed-window token bucket: each IP gets `capacity` requests per `window`,
/// refilled to full capacity when the window elapses.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed (and consumes a token).
    pub fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();

        let bucket = buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.capacity,
            window_start: now,
        });

        if now.duration_since(bucket.window_start) >= self.window {
            bucket.tokens = self.capacity;
            bucket.window_start = now;
        }

        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn allows_up_to_capacity_requests() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check(ip()));
        assert!(limiter.check(ip()));
        assert!(limiter.check(ip()));
    }

    #[test]
    fn denies_the_request_after_capacity_is_exhausted() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check(ip()));
        assert!(limiter.check(ip()));
        assert!(!limiter.check(ip()));
    }

    #[test]
    fn refills_after_the_window_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check(ip()));
        assert!(!limiter.check(ip()));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip()));
    }

    #[test]
    fn tracks_separate_ips_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert!(limiter.check(ip()));
        assert!(limiter.check(other));
        assert!(!limiter.check(ip()));
    }
}
