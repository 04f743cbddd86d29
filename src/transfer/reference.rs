// Share link validation and video id extraction

use super::errors::ReferenceError;
use super::models::VideoReference;
use crate::config::SourceConfig;

/// True iff `url` is an https link containing the platform host. No I/O.
pub fn validate(url: &str, host: &str) -> bool {
    let trimmed = url.trim();
    !host.is_empty() && trimmed.starts_with("https://") && trimmed.contains(host)
}

/// Last path segment of `url`, cut at the first `?`
pub fn extract_id(url: &str) -> Result<String, ReferenceError> {
    let trimmed = url.trim();
    let segment = trimmed.rsplit('/').next().unwrap_or_default();
    let id = segment.split('?').next().unwrap_or_default();

    if id.is_empty() {
        return Err(ReferenceError::MissingId(trimmed.to_string()));
    }
    Ok(id.to_string())
}

impl VideoReference {
    /// Validate and split a share link
    pub fn parse(url: &str, source: &SourceConfig) -> Result<Self, ReferenceError> {
        if !validate(url, &source.host) {
            return Err(ReferenceError::InvalidUrl(url.trim().to_string()));
        }
        let id = extract_id(url)?;
        Ok(Self {
            raw_url: url.trim().to_string(),
            id,
        })
    }
}
