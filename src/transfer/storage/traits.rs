// Destination storage trait definition

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::transfer::errors::StorageError;
use crate::transfer::models::{UploadRequest, UploadedFile};
use crate::transfer::relay::MediaStream;

/// Trait for destination storage implementations
///
/// The body is consumed as it arrives; implementations must not buffer the
/// whole payload. When `cancel` fires they stop writing, discard whatever
/// was partially written and return `StorageError::Cancelled`.
#[async_trait]
pub trait DestinationStorage: Send + Sync {
    /// Name of the destination (for logging)
    fn name(&self) -> &'static str;

    async fn upload(
        &self,
        request: UploadRequest,
        body: MediaStream,
        cancel: CancellationToken,
    ) -> Result<UploadedFile, StorageError>;
}
