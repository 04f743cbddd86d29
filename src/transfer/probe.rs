// Size prober - advisory content length of the media URL

use std::time::Duration;

use super::models::SizeInfo;
use super::utils::describe_error;

pub struct SizeProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl SizeProber {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// HEAD the media URL. `None` whenever the length cannot be learned;
    /// this never fails the caller.
    pub async fn probe_size(&self, media_url: &str) -> Option<SizeInfo> {
        let response = match self.client.head(media_url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %describe_error(&e), "Size probe request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "Size probe refused");
            return None;
        }

        // The header is read directly: a HEAD response has no body to size
        let bytes = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())?;

        Some(SizeInfo::new(bytes))
    }
}
