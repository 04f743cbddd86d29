// Embed-info extractor - uses the platform's public oEmbed endpoint
//
// Gives the richest result (duration, thumbnail, dimensions) but is
// unavailable for some private or workspace-restricted videos.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::traits::MetadataExtractor;
use crate::transfer::errors::MetadataError;
use crate::transfer::models::{Metadata, VideoReference};

#[derive(Debug, Deserialize)]
struct EmbedInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail_url: Option<String>,
    width: Option<f64>,
    height: Option<f64>,
}

pub struct EmbedInfoExtractor {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl EmbedInfoExtractor {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/oembed", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MetadataExtractor for EmbedInfoExtractor {
    fn name(&self) -> &'static str {
        "embed-info"
    }

    async fn extract(&self, reference: &VideoReference) -> Result<Metadata, MetadataError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("url", reference.raw_url.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Unavailable(format!("oEmbed returned HTTP {}", status.as_u16())));
        }

        let info: EmbedInfo = response.json().await?;
        let title = info
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| MetadataError::Unavailable("oEmbed response has no title".to_string()))?;

        Ok(Metadata {
            title,
            duration_seconds: info.duration.filter(|d| d.is_finite() && *d >= 0.0),
            thumbnail_url: info.thumbnail_url.filter(|u| !u.is_empty()),
            width: info.width.map(|w| w as u32),
            height: info.height.map(|h| h as u32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> VideoReference {
        VideoReference {
            raw_url: "https://www.loom.com/share/abc123?x=1".to_string(),
            id: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_parses_embed_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::UrlEncoded(
                "url".into(),
                "https://www.loom.com/share/abc123?x=1".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title":"Demo | Loom","duration":125.7,"thumbnail_url":"https://cdn.loom.com/t.gif","width":1280,"height":720}"#,
            )
            .create_async()
            .await;

        let extractor = EmbedInfoExtractor::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        let metadata = extractor.extract(&reference()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(metadata.title, "Demo | Loom");
        assert_eq!(metadata.duration_seconds, Some(125.7));
        assert_eq!(metadata.duration_display().as_deref(), Some("2:05"));
        assert_eq!(metadata.width, Some(1280));
        assert_eq!(metadata.height, Some(720));
    }

    #[tokio::test]
    async fn test_missing_title_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"  ","duration":3}"#)
            .create_async()
            .await;

        let extractor = EmbedInfoExtractor::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        let err = extractor.extract(&reference()).await.unwrap_err();
        assert!(matches!(err, MetadataError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let extractor = EmbedInfoExtractor::new(reqwest::Client::new(), server.url(), Duration::from_secs(5));
        assert!(extractor.extract(&reference()).await.is_err());
    }
}
