// Caller-facing operations

use tokio_util::sync::CancellationToken;

use crate::transfer::errors::TransferError;
use crate::transfer::models::{TransferRequest, TransferResult, VideoDetails, VideoReference};
use crate::transfer::orchestrator::TransferOrchestrator;
use crate::transfer::session::TransferSession;

/// Pre-flight lookup: title, duration, thumbnail and an advisory size.
///
/// Only an invalid reference is an error. A platform that refuses the media
/// URL exchange leaves `size` empty, since nothing is transferred yet.
pub async fn get_video_details(orchestrator: &TransferOrchestrator, url: &str) -> Result<VideoDetails, TransferError> {
    let reference = VideoReference::parse(url, orchestrator.source())?;
    tracing::info!(video_id = %reference.id, "Getting video details");

    let (metadata, located) = tokio::join!(
        orchestrator.metadata_resolver().resolve(&reference),
        orchestrator.locator().resolve_download_url(&reference.id),
    );

    let size = match located {
        Ok(descriptor) => orchestrator.prober().probe_size(&descriptor.media_url).await,
        Err(e) => {
            tracing::warn!(video_id = %reference.id, error = %e, "No media URL, size unknown");
            None
        }
    };

    let threshold = orchestrator.transfer_config().small_file_warning_bytes;
    let size_warning = size
        .as_ref()
        .map_or(false, |s| s.is_suspiciously_small(threshold));

    Ok(VideoDetails {
        id: reference.id,
        duration: metadata.duration_display(),
        title: metadata.title,
        duration_seconds: metadata.duration_seconds,
        thumbnail_url: metadata.thumbnail_url,
        width: metadata.width,
        height: metadata.height,
        size,
        size_warning,
    })
}

/// Stream one video into the destination. `cancel` aborts it at any stage.
pub async fn transfer_video(
    orchestrator: &TransferOrchestrator,
    request: TransferRequest,
    cancel: CancellationToken,
) -> TransferResult {
    let session = TransferSession::with_cancel_token(request, cancel);
    orchestrator.run(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transfer::errors::FailureKind;
    use crate::transfer::models::Credential;

    fn orchestrator(base_url: String) -> TransferOrchestrator {
        let mut config = AppConfig::default();
        config.source.base_url = base_url.clone();
        config.drive.upload_base = base_url;
        TransferOrchestrator::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_video_details() {
        let mut server = mockito::Server::new_async().await;
        let media_url = format!("{}/media/abc123.mp4", server.url());
        server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Demo | Loom","duration":95,"thumbnail_url":"https://cdn.loom.com/t.gif","width":1920,"height":1080}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/campaigns/sessions/abc123/transcoded-url")
            .with_status(200)
            .with_body(serde_json::json!({ "url": media_url }).to_string())
            .create_async()
            .await;
        server
            .mock("HEAD", "/media/abc123.mp4")
            .with_status(200)
            .with_header("content-length", "2048")
            .create_async()
            .await;

        let details = get_video_details(&orchestrator(server.url()), "https://www.loom.com/share/abc123")
            .await
            .unwrap();

        assert_eq!(details.id, "abc123");
        assert_eq!(details.title, "Demo");
        assert_eq!(details.duration.as_deref(), Some("1:35"));
        assert_eq!(details.width, Some(1920));
        assert_eq!(details.size.as_ref().map(|s| s.bytes), Some(2048));
        assert!(details.size_warning);
    }

    #[tokio::test]
    async fn test_video_details_without_media_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/oembed")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"title":"Demo"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/campaigns/sessions/abc123/transcoded-url")
            .with_status(404)
            .create_async()
            .await;

        let details = get_video_details(&orchestrator(server.url()), "https://www.loom.com/share/abc123")
            .await
            .unwrap();

        assert_eq!(details.title, "Demo");
        assert!(details.size.is_none());
        assert!(!details.size_warning);
    }

    #[tokio::test]
    async fn test_video_details_rejects_foreign_url() {
        let err = get_video_details(&orchestrator("http://127.0.0.1:9".to_string()), "https://example.com/share/abc")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidReference);
    }

    #[tokio::test]
    async fn test_transfer_honors_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = TransferRequest {
            source_url: "https://www.loom.com/share/abc123".to_string(),
            destination_name: None,
            credential: Credential::new("token"),
            destination_folder_id: None,
        };

        let result = transfer_video(&orchestrator("http://127.0.0.1:9".to_string()), request, cancel).await;
        assert_eq!(result.failure, Some(FailureKind::Cancelled));
        assert_eq!(result.message, "Transfer was cancelled");
    }
}
