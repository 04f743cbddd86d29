// Metadata resolver - ordered fallback over extractors
//
// Each extractor runs inside its own failure boundary; the first one that
// yields a non-empty title wins. Total failure falls back to the video id.

use std::time::Duration;

use super::embed::EmbedInfoExtractor;
use super::page::PageMarkupExtractor;
use super::traits::MetadataExtractor;
use crate::config::SourceConfig;
use crate::transfer::models::{Metadata, VideoReference};
use crate::transfer::utils::{sanitize_file_name, strip_brand_suffix};

pub struct MetadataResolver {
    extractors: Vec<Box<dyn MetadataExtractor>>,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Embed info first, share page markup second
    pub fn for_source(client: reqwest::Client, source: &SourceConfig, timeout: Duration) -> Self {
        let mut resolver = Self::new();
        resolver.add_extractor(Box::new(EmbedInfoExtractor::new(
            client.clone(),
            source.base_url.clone(),
            timeout,
        )));
        resolver.add_extractor(Box::new(PageMarkupExtractor::new(
            client,
            source.base_url.clone(),
            timeout,
        )));
        resolver
    }

    pub fn add_extractor(&mut self, extractor: Box<dyn MetadataExtractor>) {
        self.extractors.push(extractor);
    }

    /// Never fails. The returned title is sanitized and non-empty.
    pub async fn resolve(&self, reference: &VideoReference) -> Metadata {
        for extractor in &self.extractors {
            tracing::debug!(video_id = %reference.id, extractor = extractor.name(), "Trying metadata extractor");

            match extractor.extract(reference).await {
                Ok(metadata) if !metadata.title.trim().is_empty() => {
                    let title = sanitize_file_name(&strip_brand_suffix(&metadata.title));
                    if title.is_empty() {
                        continue;
                    }
                    tracing::info!(video_id = %reference.id, extractor = extractor.name(), title = %title, "Resolved video title");
                    return Metadata { title, ..metadata };
                }
                Ok(_) => {
                    tracing::debug!(extractor = extractor.name(), "Extractor returned an empty title");
                }
                Err(e) => {
                    tracing::warn!(video_id = %reference.id, extractor = extractor.name(), error = %e, "Metadata extractor failed");
                }
            }
        }

        tracing::warn!(video_id = %reference.id, "Could not extract video title, using video id");
        Metadata::fallback(reference)
    }
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::errors::MetadataError;
    use async_trait::async_trait;

    struct Fixed(Result<&'static str, &'static str>);

    #[async_trait]
    impl MetadataExtractor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(&self, _reference: &VideoReference) -> Result<Metadata, MetadataError> {
            match self.0 {
                Ok(title) => Ok(Metadata {
                    title: title.to_string(),
                    duration_seconds: Some(42.0),
                    ..Metadata::default()
                }),
                Err(reason) => Err(MetadataError::Unavailable(reason.to_string())),
            }
        }
    }

    fn reference() -> VideoReference {
        VideoReference {
            raw_url: "https://www.loom.com/share/abc123".to_string(),
            id: "abc123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_failure_falls_through_to_next() {
        let mut resolver = MetadataResolver::new();
        resolver.add_extractor(Box::new(Fixed(Err("down"))));
        resolver.add_extractor(Box::new(Fixed(Ok("  Design: review  "))));

        let metadata = resolver.resolve(&reference()).await;
        assert_eq!(metadata.title, "Design- review");
        assert_eq!(metadata.duration_seconds, Some(42.0));
    }

    #[tokio::test]
    async fn test_empty_title_is_a_miss() {
        let mut resolver = MetadataResolver::new();
        resolver.add_extractor(Box::new(Fixed(Ok("   "))));
        resolver.add_extractor(Box::new(Fixed(Ok("Second"))));

        assert_eq!(resolver.resolve(&reference()).await.title, "Second");
    }

    #[tokio::test]
    async fn test_brand_suffix_removed_from_any_strategy() {
        let mut resolver = MetadataResolver::new();
        resolver.add_extractor(Box::new(Fixed(Ok("Demo | Loom"))));

        assert_eq!(resolver.resolve(&reference()).await.title, "Demo");
    }

    #[tokio::test]
    async fn test_total_failure_uses_video_id() {
        let mut resolver = MetadataResolver::new();
        resolver.add_extractor(Box::new(Fixed(Err("down"))));
        resolver.add_extractor(Box::new(Fixed(Err("also down"))));

        let metadata = resolver.resolve(&reference()).await;
        assert_eq!(metadata, Metadata::fallback(&reference()));
        assert_eq!(metadata.title, "abc123");
    }

    #[tokio::test]
    async fn test_unreachable_platform_uses_video_id() {
        // Nothing listens on port 9 of the loopback interface
        let source = SourceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            host: "www.loom.com".to_string(),
        };
        let resolver = MetadataResolver::for_source(reqwest::Client::new(), &source, Duration::from_secs(2));
        assert_eq!(resolver.resolve(&reference()).await.title, "abc123");
    }

    #[tokio::test]
    async fn test_embed_miss_falls_back_to_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;
        server
            .mock("GET", "/share/abc123")
            .with_status(200)
            .with_body(r#"<meta property="og:title" content="Weekly | sync | Loom">"#)
            .create_async()
            .await;

        let source = SourceConfig {
            base_url: server.url(),
            host: "www.loom.com".to_string(),
        };
        let resolver = MetadataResolver::for_source(reqwest::Client::new(), &source, Duration::from_secs(5));
        assert_eq!(resolver.resolve(&reference()).await.title, "Weekly - sync");
    }
}
