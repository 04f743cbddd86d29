// Helper functions shared by the pipeline stages

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::NetworkConfig;

pub const MAX_TITLE_CHARS: usize = 200;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

lazy_static! {
    static ref UNSAFE_RE: Regex = Regex::new(r#"[<>:"/\\|?*\p{Cc}]"#).unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref BRAND_SUFFIX_RE: Regex = Regex::new(r"(?i)\s*\|\s*Loom\s*$").unwrap();
}

/// Build the HTTP client used by every stage.
///
/// Falls back to a direct connection when the proxy URL does not parse.
pub fn build_client(config: &NetworkConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout());

    if let Some(proxy_url) = config.proxy.as_deref() {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                tracing::warn!(proxy = %proxy_url, error = %e, "Invalid proxy URL, connecting directly");
            }
        }
    }

    builder.build()
}

/// Describe a request failure without echoing its URL; media URLs carry
/// short-lived signatures
pub fn describe_error(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_body() || e.is_decode() {
        "body read failed"
    } else {
        "request failed"
    };

    match std::error::Error::source(e) {
        Some(cause) => format!("{}: {}", kind, cause),
        None => kind.to_string(),
    }
}

/// Make a title safe to use as a file name.
///
/// Idempotent: sanitizing an already sanitized title returns it unchanged.
pub fn sanitize_file_name(name: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(name, " ");
    let replaced = UNSAFE_RE.replace_all(&collapsed, "-");
    let capped: String = replaced.trim().chars().take(MAX_TITLE_CHARS).collect();
    capped.trim_end().to_string()
}

/// Remove a trailing " | Loom" and surrounding whitespace
pub fn strip_brand_suffix(title: &str) -> String {
    BRAND_SUFFIX_RE.replace(title, "").trim().to_string()
}

/// Render seconds as `m:ss`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Render a byte count with base-1024 units and at most two decimals
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut index = 0;
    while index + 1 < UNITS.len() && bytes >= 1024u64.pow(index as u32 + 1) {
        index += 1;
    }

    let value = bytes as f64 / 1024f64.powi(index as i32);
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[index])
}
