use std::time::Duration;

/// Runtime configuration, resolved once at startup from environment variables.
///
/// Each `resolve_*` helper follows the same pattern as the rest of this
/// module: `env::var(..).ok().and_then(|v| v.parse().ok()).unwrap_or(default)`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub wlo_base_url: String,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub max_retries: u32,
    pub max_candidates: usize,
    pub outbound_limit: usize,
    pub rate_limit_per_minute: u32,
    pub detection_cache_ttl: Duration,
    pub detection_cache_max_size: usize,
    pub admin_api_key: Option<String>,
    pub default_similarity_threshold: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            bind_addr: resolve_bind_addr(),
            wlo_base_url: resolve_string("WLO_BASE_URL", "https://repository.staging.openeduhub.net"),
            http_timeout: Duration::from_secs(resolve_parsed("WLO_TIMEOUT", 60)),
            http_connect_timeout: Duration::from_secs(resolve_parsed(
                "HTTP_CONNECT_TIMEOUT_SECS",
                5,
            )),
            max_retries: resolve_parsed("WLO_MAX_RETRIES", 3),
            max_candidates: resolve_parsed("MAX_CANDIDATES", 40),
            outbound_limit: resolve_parsed("OUTBOUND_LIMIT", 10),
            rate_limit_per_minute: resolve_rate_limit("RATE_LIMIT", 100),
            detection_cache_ttl: Duration::from_secs(resolve_clamped(
                "DETECTION_CACHE_TTL",
                3600,
                60,
                86_400,
            )),
            detection_cache_max_size: resolve_clamped("DETECTION_CACHE_MAX_SIZE", 1000, 10, 10_000),
            admin_api_key: std::env::var("ADMIN_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            default_similarity_threshold: resolve_parsed("DEFAULT_SIMILARITY_THRESHOLD", 0.9),
        }
    }
}

/// `BIND_ADDR` wins outright; otherwise the port half falls back to
/// `PORT`/`SERVICE_PORT`, mirroring the original service's convention of a
/// dedicated port knob alongside a full-address override.
fn resolve_bind_addr() -> String {
    if let Some(addr) = std::env::var("BIND_ADDR").ok().filter(|v| !v.trim().is_empty()) {
        return addr;
    }
    let port = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("SERVICE_PORT").ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "8080".to_string());
    format!("0.0.0.0:{port}")
}

fn resolve_string(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn resolve_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`resolve_parsed`], but clamps the resolved value (including the
/// default) into `[min, max]` so an out-of-range env value is corrected
/// rather than silently accepted.
fn resolve_clamped<T: std::str::FromStr + Ord>(var: &str, default: T, min: T, max: T) -> T {
    resolve_parsed(var, default).clamp(min, max)
}

/// `RATE_LIMIT` is documented as `<N>/<window>` (e.g. `100/minute`); only the
/// `N` before the slash governs the per-IP token bucket capacity.
fn resolve_rate_limit(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.split('/').next().map(str::trim).and_then(|n| n.parse().ok()))
        .unwrap_or(default)
}
