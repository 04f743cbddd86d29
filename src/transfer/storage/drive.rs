// Google Drive backend - resumable upload fed straight from the relay
//
// 1. POST file metadata to open a resumable session (Location header)
// 2. PUT the media stream to the session URI
// 3. On cancellation or a failed body, DELETE the session so no partial
//    file is left behind

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::traits::DestinationStorage;
use crate::transfer::errors::StorageError;
use crate::transfer::models::{Credential, UploadRequest, UploadedFile};
use crate::transfer::relay::MediaStream;
use crate::transfer::utils::describe_error;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    // Drive encodes int64 fields as strings
    size: Option<String>,
}

pub struct DriveStorage {
    client: reqwest::Client,
    upload_base: String,
}

impl DriveStorage {
    pub fn new(client: reqwest::Client, upload_base: impl Into<String>) -> Self {
        Self {
            client,
            upload_base: upload_base.into(),
        }
    }

    async fn create_session(&self, request: &UploadRequest) -> Result<String, StorageError> {
        let url = format!(
            "{}/upload/drive/v3/files",
            self.upload_base.trim_end_matches('/')
        );
        let metadata = FileMetadata {
            name: &request.name,
            mime_type: &request.mime_type,
            parents: request.parent_folder_id.as_deref().into_iter().collect(),
        };

        let mut builder = self
            .client
            .post(url)
            .query(&[("uploadType", "resumable"), ("fields", "id,name,size")])
            .bearer_auth(request.credential.secret())
            .header("X-Upload-Content-Type", request.mime_type.as_str())
            .json(&metadata);
        if let Some(length) = request.content_length {
            builder = builder.header("X-Upload-Content-Length", length);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::Session(describe_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Session(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| StorageError::InvalidResponse("resumable session has no Location".to_string()))
    }

    /// Best effort; a failure here is logged and never replaces the original error
    async fn discard_session(&self, session_uri: &str, credential: &Credential) {
        let result = self
            .client
            .delete(session_uri)
            .bearer_auth(credential.secret())
            .send()
            .await;

        match result {
            Ok(response) => {
                tracing::debug!(status = response.status().as_u16(), "Discarded resumable upload session");
            }
            Err(e) => {
                tracing::warn!(error = %describe_error(&e), "Failed to discard resumable upload session");
            }
        }
    }

    async fn finish(response: reqwest::Response) -> Result<UploadedFile, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(describe_error(&e)))?;

        Ok(UploadedFile {
            id: file.id,
            name: file.name,
            size: file.size.and_then(|s| s.parse().ok()),
        })
    }
}

#[async_trait]
impl DestinationStorage for DriveStorage {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    async fn upload(
        &self,
        request: UploadRequest,
        body: MediaStream,
        cancel: CancellationToken,
    ) -> Result<UploadedFile, StorageError> {
        let session_uri = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StorageError::Cancelled),
            uri = self.create_session(&request) => uri?,
        };

        tracing::debug!(name = %request.name, "Opened resumable upload session");

        let put = self
            .client
            .put(&session_uri)
            .bearer_auth(request.credential.secret())
            .header(reqwest::header::CONTENT_TYPE, request.mime_type.as_str())
            .body(reqwest::Body::wrap_stream(body))
            .send();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            response = put => Some(response),
        };

        let result = match outcome {
            None => Err(StorageError::Cancelled),
            Some(Err(e)) => Err(StorageError::UploadFailed(describe_error(&e))),
            Some(Ok(response)) => Self::finish(response).await,
        };

        if result.is_err() {
            self.discard_session(&session_uri, &request.credential).await;
        }
        result
    }
}
