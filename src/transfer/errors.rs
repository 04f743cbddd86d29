// Error types for the transfer pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classified reason a transfer session did not complete.
///
/// Every component error is mapped to exactly one of these at the
/// orchestrator boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureKind {
    /// The URL is not a share link on the source platform
    InvalidReference,
    /// The platform refused or errored the media URL exchange
    DownloadUnavailable,
    /// The media URL answered with a non-success status or could not be reached
    StreamOpen { status: Option<u16> },
    /// The media host did not answer within the connection deadline
    Timeout,
    /// The destination write failed for a reason other than cancellation
    UploadFailed,
    /// The session's cancellation token fired before completion
    Cancelled,
}

impl FailureKind {
    /// Status code class reported to callers. Cancellation uses 499 so it can
    /// be told apart from system errors.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidReference => 400,
            Self::Cancelled => 499,
            Self::UploadFailed => 500,
            Self::DownloadUnavailable | Self::StreamOpen { .. } | Self::Timeout => 502,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReference => write!(f, "invalid reference"),
            Self::DownloadUnavailable => write!(f, "download unavailable"),
            Self::StreamOpen { status: Some(code) } => write!(f, "stream open error ({})", code),
            Self::StreamOpen { status: None } => write!(f, "stream open error"),
            Self::Timeout => write!(f, "timeout"),
            Self::UploadFailed => write!(f, "upload failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Share URL rejected by the reference resolver
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Invalid Loom URL: {0}")]
    InvalidUrl(String),

    #[error("Could not extract a video id from: {0}")]
    MissingId(String),
}

/// A single metadata strategy came up empty. Never leaves the resolver.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata unavailable: {0}")]
    Unavailable(String),

    #[error("Metadata request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("Transcoding endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Transcoding response had no media URL")]
    MissingUrl,

    #[error("Transcoding request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to get video stream: HTTP {0}")]
    Status(u16),

    #[error("Media host did not respond within {0}s")]
    Timeout(u64),

    #[error("Request error: {0}")]
    Connect(String),
}

/// Destination storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload session could not be created: {0}")]
    Session(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Unexpected storage response: {0}")]
    InvalidResponse(String),

    #[error("Upload cancelled")]
    Cancelled,
}

/// Any failure that ends a session, already tied to its classification.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Failed to get download URL: {0}")]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Transfer was cancelled")]
    Cancelled,
}

impl TransferError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Reference(_) => FailureKind::InvalidReference,
            Self::Locator(_) => FailureKind::DownloadUnavailable,
            Self::Relay(RelayError::Status(code)) => FailureKind::StreamOpen {
                status: Some(*code),
            },
            Self::Relay(RelayError::Connect(_)) => FailureKind::StreamOpen { status: None },
            Self::Relay(RelayError::Timeout(_)) => FailureKind::Timeout,
            Self::Storage(StorageError::Cancelled) | Self::Cancelled => FailureKind::Cancelled,
            Self::Storage(_) => FailureKind::UploadFailed,
        }
    }
}
