//! URL normalization for exact-match detection.
//!
//! Canonicalises a URL down to a comparison key: two URLs are considered
//! "the same page" iff their normalized keys are byte-equal.

use url::Url;

/// Normalize a URL into its canonical comparison key.
///
/// 1. Lowercase the entire URL.
/// 2. Strip the scheme and a leading `www.`.
/// 3. Remove the query string and fragment.
/// 4. Strip a trailing `/`.
/// 5. Collapse known YouTube link shapes onto `youtube.com/watch?v=<id>`.
///
/// The empty string normalizes to the empty string, and is never URL-exact
/// with anything (callers must check for emptiness before comparing).
/// Parsing is best-effort: inputs `url::Url` can't parse (no scheme, bare
/// `example.com/path`) fall back to a lowercase/www-stripped form of the raw
/// string rather than producing an empty key.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_lowercase();

    let (host, path) = match Url::parse(&lower) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("").to_string(),
            parsed.path().to_string(),
        ),
        Err(_) => match Url::parse(&format!("https://{lower}")) {
            Ok(parsed) => (
                parsed.host_str().unwrap_or("").to_string(),
                parsed.path().to_string(),
            ),
            Err(_) => (String::new(), lower.clone()),
        },
    };

    let host = host.strip_prefix("www.").unwrap_or(&host);
    let path = path.strip_suffix('/').unwrap_or(&path);
    let key = if host.is_empty() {
        path.to_string()
    } else {
        format!("{host}{path}")
    };

    if let Some(id) = youtube_video_id(host, path, &lower) {
        return format!("youtube.com/watch?v={id}");
    }

    key
}

/// Recognizes `youtu.be/<id>`, `youtube.com/embed/<id>`,
/// `youtube.com/shorts/<id>`, `youtube.com/v/<id>` and the canonical
/// `youtube.com/watch?v=<id>` form.
fn youtube_video_id(host: &str, path: &str, raw_lower: &str) -> Option<String> {
    let path = path.trim_start_matches('/');

    if host == "youtu.be" {
        return Some(first_segment(path).to_string());
    }
    if host.ends_with("youtube.com") {
        if let Some(rest) = path.strip_prefix("embed/") {
            return Some(first_segment(rest).to_string());
        }
        if let Some(rest) = path.strip_prefix("shorts/") {
            return Some(first_segment(rest).to_string());
        }
        if let Some(rest) = path.strip_prefix("v/") {
            return Some(first_segment(rest).to_string());
        }
        if path.starts_with("watch") {
            let query = raw_lower.split('?').nth(1)?;
            for pair in query.split('&') {
                if let Some(id) = pair.strip_prefix("v=") {
                    return Some(first_segment(id).to_string());
                }
            }
        }
    }
    None
}

fn first_segment(s: &str) -> &str {
    s.split(['/', '&', '#']).next().unwrap_or(s)
}
