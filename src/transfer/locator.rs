// Download locator - exchanges a video id for a direct media URL

use serde::Deserialize;
use std::time::Duration;

use super::errors::LocatorError;
use super::models::DownloadDescriptor;

#[derive(Debug, Deserialize)]
struct TranscodedUrl {
    url: Option<String>,
}

pub struct DownloadLocator {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DownloadLocator {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// One POST to the transcoding session endpoint. No retry; the URL it
    /// returns is valid for a single use shortly after issuance.
    pub async fn resolve_download_url(&self, id: &str) -> Result<DownloadDescriptor, LocatorError> {
        let url = format!(
            "{}/api/campaigns/sessions/{}/transcoded-url",
            self.base_url.trim_end_matches('/'),
            id
        );

        let response = self.client.post(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(video_id = %id, status = status.as_u16(), "Transcoding endpoint refused the request");
            return Err(LocatorError::Status(status.as_u16()));
        }

        let body: TranscodedUrl = response.json().await?;
        let media_url = body
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(LocatorError::MissingUrl)?;

        tracing::debug!(video_id = %id, "Resolved direct media URL");

        Ok(DownloadDescriptor {
            media_url,
            probed_size: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/api/campaigns/sessions/abc123/transcoded-url";

    #[tokio::test]
    async fn test_returns_media_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url":"https://cdn.loom.com/sessions/abc123.mp4?Signature=x"}"#)
            .expect(1)
            .create_async()
            .await;

        let locator = DownloadLocator::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        let descriptor = locator.resolve_download_url("abc123").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            descriptor.media_url,
            "https://cdn.loom.com/sessions/abc123.mp4?Signature=x"
        );
        assert!(descriptor.probed_size.is_none());
    }

    #[tokio::test]
    async fn test_refusal_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let locator = DownloadLocator::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        let err = locator.resolve_download_url("abc123").await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, LocatorError::Status(500)));
    }

    #[tokio::test]
    async fn test_missing_url_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(r#"{"url":null}"#)
            .create_async()
            .await;

        let locator = DownloadLocator::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        assert!(matches!(
            locator.resolve_download_url("abc123").await,
            Err(LocatorError::MissingUrl)
        ));
    }
}
