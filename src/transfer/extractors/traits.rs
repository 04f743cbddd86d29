// MetadataExtractor trait

use async_trait::async_trait;

use crate::transfer::errors::MetadataError;
use crate::transfer::models::{Metadata, VideoReference};

/// One strategy in the metadata fallback chain.
///
/// Implementations return the raw (unsanitized) title; the resolver sanitizes
/// whichever result wins. An empty title counts as a miss.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    async fn extract(&self, reference: &VideoReference) -> Result<Metadata, MetadataError>;
}
