// Common data models for the transfer pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::FailureKind;

pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// A validated share link and the video id derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    pub raw_url: String,
    pub id: String,
}

/// Best-effort video metadata. `title` is always present and sanitized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Metadata {
    /// Metadata carrying only the fallback title
    pub fn fallback(reference: &VideoReference) -> Self {
        Self {
            title: reference.id.clone(),
            ..Self::default()
        }
    }

    /// Duration as `m:ss`, seconds floored
    pub fn duration_display(&self) -> Option<String> {
        self.duration_seconds.map(super::utils::format_duration)
    }
}

/// Direct media location. The URL is short-lived and must not outlive the session.
#[derive(Clone)]
pub struct DownloadDescriptor {
    pub media_url: String,
    pub probed_size: Option<SizeInfo>,
}

impl fmt::Debug for DownloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible = self.media_url.split('?').next().unwrap_or_default();
        f.debug_struct("DownloadDescriptor")
            .field("media_url", &format!("{}?<redacted>", visible))
            .field("probed_size", &self.probed_size)
            .finish()
    }
}

/// Content length learned from a metadata-only request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeInfo {
    pub bytes: u64,
    pub formatted: String,
}

impl SizeInfo {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes,
            formatted: super::utils::format_size(bytes),
        }
    }

    /// Advisory only: very small files are usually error pages, not videos
    pub fn is_suspiciously_small(&self, threshold_bytes: u64) -> bool {
        self.bytes < threshold_bytes
    }
}

/// Bearer token for the destination account, supplied by the caller
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(***)")
    }
}

/// Incoming transfer request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub source_url: String,
    pub destination_name: Option<String>,
    pub credential: Credential,
    pub destination_folder_id: Option<String>,
}

/// What the destination needs to create the file
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub parent_folder_id: Option<String>,
    pub mime_type: String,
    pub credential: Credential,
    /// Size hint from the prober, if any
    pub content_length: Option<u64>,
}

/// Descriptor returned by the destination after a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: Option<u64>,
}

/// Session lifecycle. `Completed`, `Cancelled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferState {
    Idle,
    ValidatingReference,
    ResolvingMetadata,
    ResolvingDownloadUrl,
    Streaming,
    Uploading,
    Completed,
    Cancelled,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ValidatingReference => "validating-reference",
            Self::ResolvingMetadata => "resolving-metadata",
            Self::ResolvingDownloadUrl => "resolving-download-url",
            Self::Streaming => "streaming",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub success: bool,
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    pub bytes_transferred: Option<u64>,
    pub failure: Option<FailureKind>,
    pub message: String,
    pub video_title: Option<String>,
}

impl TransferResult {
    pub fn completed(file: UploadedFile, bytes_transferred: u64, video_title: String) -> Self {
        Self {
            success: true,
            destination_id: Some(file.id),
            destination_name: Some(file.name),
            bytes_transferred: Some(bytes_transferred),
            failure: None,
            message: "Video successfully streamed to Google Drive without local storage"
                .to_string(),
            video_title: Some(video_title),
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>, video_title: Option<String>) -> Self {
        Self {
            success: false,
            destination_id: None,
            destination_name: None,
            bytes_transferred: None,
            failure: Some(kind),
            message: message.into(),
            video_title,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.failure.map_or(200, |kind| kind.status_code())
    }
}

/// Pre-flight information shown before a transfer is confirmed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub duration: Option<String>,
    pub duration_seconds: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<SizeInfo>,
    pub size_warning: bool,
}
