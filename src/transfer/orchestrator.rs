// Transfer orchestrator - sequences the pipeline for one session
//
// Idle -> ValidatingReference -> ResolvingMetadata / ResolvingDownloadUrl
//      -> Streaming -> Uploading -> Completed | Cancelled | Failed
//
// Cancellation is checked before every stage and awaited during the long
// ones. The relay is destroyed on every exit path except Completed.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::errors::{StorageError, TransferError};
use super::extractors::MetadataResolver;
use super::locator::DownloadLocator;
use super::models::{
    TransferResult, TransferState, UploadRequest, UploadedFile, VideoReference, VIDEO_MIME_TYPE,
};
use super::probe::SizeProber;
use super::relay::StreamRelay;
use super::session::TransferSession;
use super::storage::{DestinationStorage, DriveStorage};
use super::utils::build_client;
use crate::config::{AppConfig, SourceConfig, TransferConfig};

pub struct TransferOrchestrator {
    source: SourceConfig,
    metadata: MetadataResolver,
    locator: DownloadLocator,
    prober: SizeProber,
    relay: StreamRelay,
    storage: Box<dyn DestinationStorage>,
    connect_timeout: Duration,
    transfer: TransferConfig,
}

impl TransferOrchestrator {
    pub fn new(config: &AppConfig, client: reqwest::Client, storage: Box<dyn DestinationStorage>) -> Self {
        let timeout = config.network.request_timeout();
        Self {
            source: config.source.clone(),
            metadata: MetadataResolver::for_source(client.clone(), &config.source, timeout),
            locator: DownloadLocator::new(client.clone(), config.source.base_url.clone(), timeout),
            prober: SizeProber::new(client.clone(), timeout),
            relay: StreamRelay::new(client),
            storage,
            connect_timeout: config.network.connect_timeout(),
            transfer: config.transfer.clone(),
        }
    }

    /// Loom source, Google Drive destination
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(&config.network)?;
        let storage = DriveStorage::new(client.clone(), config.drive.upload_base.clone());
        Ok(Self::new(config, client, Box::new(storage)))
    }

    pub(crate) fn metadata_resolver(&self) -> &MetadataResolver {
        &self.metadata
    }

    pub(crate) fn locator(&self) -> &DownloadLocator {
        &self.locator
    }

    pub(crate) fn prober(&self) -> &SizeProber {
        &self.prober
    }

    pub(crate) fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub(crate) fn transfer_config(&self) -> &TransferConfig {
        &self.transfer
    }

    /// Drive one session to a terminal state. Never returns an unclassified error.
    pub async fn run(&self, mut session: TransferSession) -> TransferResult {
        let outcome = self.execute(&mut session).await;
        self.finish(&session, outcome)
    }

    async fn execute(&self, session: &mut TransferSession) -> Result<(UploadedFile, u64), TransferError> {
        let cancel = session.cancel_token();

        session.advance(TransferState::ValidatingReference);
        ensure_active(&cancel)?;
        let reference = VideoReference::parse(&session.request.source_url, &self.source)?;
        tracing::info!(video_id = %reference.id, "Processing Loom video");
        session.reference = Some(reference.clone());

        // Metadata never fails and does not gate; the locator does
        session.advance(TransferState::ResolvingMetadata);
        session.advance(TransferState::ResolvingDownloadUrl);
        let (metadata, located) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            pair = async {
                tokio::join!(
                    self.metadata.resolve(&reference),
                    self.locator.resolve_download_url(&reference.id),
                )
            } => pair,
        };
        tracing::info!(video_id = %reference.id, title = %metadata.title, "Video title");
        session.metadata = Some(metadata);
        let mut descriptor = located?;

        ensure_active(&cancel)?;
        descriptor.probed_size = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            size = self.prober.probe_size(&descriptor.media_url) => size,
        };
        if let Some(size) = &descriptor.probed_size {
            if size.is_suspiciously_small(self.transfer.small_file_warning_bytes) {
                tracing::warn!(bytes = size.bytes, size = %size.formatted, "Video is suspiciously small, it may not be a complete recording");
            }
        }
        let content_length = descriptor.probed_size.as_ref().map(|s| s.bytes);
        let media_url = descriptor.media_url.clone();
        session.descriptor = Some(descriptor);

        ensure_active(&cancel)?;
        session.advance(TransferState::Streaming);
        tracing::info!(video_id = %reference.id, "Creating video stream");
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::Cancelled),
            opened = self.relay.open_stream(&media_url, self.connect_timeout) => opened,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(_) if cancel.is_cancelled() => return Err(TransferError::Cancelled),
            Err(e) => return Err(e.into()),
        };
        let handle = stream.handle();
        session.relay = Some(handle.clone());

        ensure_active(&cancel)?;
        session.advance(TransferState::Uploading);
        let request = self.upload_request(session, content_length.or(stream.content_length()));
        tracing::info!(destination = self.storage.name(), name = %request.name, "Starting direct upload");

        let upload = self.storage.upload(request, stream, cancel.clone());
        tokio::pin!(upload);
        let uploaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Cut the source at once; a destination still reading gets
                // ConnectionAborted instead of more bytes
                handle.destroy();
                self.await_destination_cleanup(&mut upload).await;
                Err(StorageError::Cancelled)
            }
            result = &mut upload => result,
        };

        // A cancelled session never completes, even if the destination
        // finished on its own
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let file = uploaded?;
        let bytes = file.size.filter(|s| *s > 0).unwrap_or_else(|| handle.bytes_read());
        Ok((file, bytes))
    }

    /// Give a cancelled destination `cancel_grace` to discard what it wrote,
    /// then drop it
    async fn await_destination_cleanup<F>(&self, upload: &mut Pin<&mut F>)
    where
        F: Future<Output = Result<UploadedFile, StorageError>>,
    {
        let grace = self.transfer.cancel_grace();
        match tokio::time::timeout(grace, upload.as_mut()).await {
            Ok(Ok(_)) => {
                tracing::warn!("Destination finished after cancellation, result discarded");
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Destination stopped after cancellation");
            }
            Err(_) => {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "Destination ignored cancellation, dropping upload");
            }
        }
    }

    fn upload_request(&self, session: &TransferSession, content_length: Option<u64>) -> UploadRequest {
        let name = session
            .request
            .destination_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("{}.mp4", video_title(session)));

        UploadRequest {
            name,
            parent_folder_id: session
                .request
                .destination_folder_id
                .clone()
                .filter(|f| !f.is_empty()),
            mime_type: VIDEO_MIME_TYPE.to_string(),
            credential: session.request.credential.clone(),
            content_length,
        }
    }

    fn finish(&self, session: &TransferSession, outcome: Result<(UploadedFile, u64), TransferError>) -> TransferResult {
        let title = session.metadata.as_ref().map(|m| m.title.clone());

        match outcome {
            Ok((file, bytes)) => {
                session.advance(TransferState::Completed);
                tracing::info!(file_id = %file.id, name = %file.name, bytes, "Upload completed successfully");
                TransferResult::completed(file, bytes, video_title(session))
            }
            Err(e) => {
                // Cleanup never replaces the failure being reported. A cancel
                // during upload has already destroyed the stream.
                if let Some(handle) = session.relay.as_ref().filter(|h| !h.is_destroyed()) {
                    handle.destroy();
                }

                let kind = e.kind();
                if kind.is_cancelled() {
                    session.advance(TransferState::Cancelled);
                    tracing::info!("Transfer was cancelled");
                } else {
                    session.advance(TransferState::Failed);
                    tracing::error!(failure = %kind, error = %e, "Streaming upload failed");
                }
                TransferResult::failed(kind, e.to_string(), title)
            }
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), TransferError> {
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    Ok(())
}

fn video_title(session: &TransferSession) -> String {
    session
        .metadata
        .as_ref()
        .map(|m| m.title.clone())
        .or_else(|| session.reference.as_ref().map(|r| r.id.clone()))
        .unwrap_or_default()
}
