//! HTTP cache validation module
//!
//! `ETag` generation and conditional request evaluation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// `ETag` for in-memory content, e.g. `"abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{v:x}\"")
}

/// `ETag` for a file on disk, derived from size and modification time
///
/// Sub-second mtime is included so a same-size rewrite within one second
/// still changes the tag.
pub fn file_etag(len: u64, modified: Option<SystemTime>) -> String {
    let (secs, nanos) = modified
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or((0, 0), |d| (d.as_secs(), d.subsec_nanos()));
    format!("\"{secs:x}.{nanos:x}-{len:x}\"")
}

/// Whether the client's `If-None-Match` matches `etag` (single, list or `*`)
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .map(|e| e.trim().trim_start_matches("W/"))
            .any(|e| e == etag || e == "*")
    })
}

/// Whether the entity is unchanged since the client's `If-Modified-Since`
///
/// HTTP dates have second precision, so the comparison drops sub-second parts.
pub fn not_modified_since(if_modified_since: Option<&str>, modified: Option<SystemTime>) -> bool {
    let (Some(header), Some(modified)) = (if_modified_since, modified) else {
        return false;
    };
    let Ok(since) = httpdate::parse_http_date(header) else {
        return false;
    };
    truncate_to_secs(modified) <= since
}

/// `Last-Modified` header value
pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Whether an `If-Range` validator still matches; ranges are honored only then
pub fn if_range_matches(if_range: Option<&str>, etag: &str, last_modified: Option<&str>) -> bool {
    match if_range.map(str::trim) {
        None => true,
        Some(v) if v.starts_with('"') => v == etag,
        Some(v) => last_modified == Some(v),
    }
}

fn truncate_to_secs(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH).map_or(time, |d| {
        UNIX_EPOCH + std::time::Duration::from_secs(d.as_secs())
    })
}
