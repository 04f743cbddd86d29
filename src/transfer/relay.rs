// Stream relay - in-memory byte stream from the media host to a sink
//
// The relay never touches local storage. Bytes flow chunk by chunk from the
// source response into whatever consumes the `MediaStream`.

use bytes::Bytes;
use futures::task::AtomicWaker;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use super::errors::RelayError;
use super::utils::describe_error;

type SourceBody = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

#[derive(Default)]
struct RelayShared {
    destroyed: AtomicBool,
    destroy_requests: AtomicUsize,
    closed: AtomicBool,
    bytes_read: AtomicU64,
    waker: AtomicWaker,
    error: Mutex<Option<String>>,
}

impl RelayShared {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                bytes_read = self.bytes_read.load(Ordering::Acquire),
                destroyed = self.destroyed.load(Ordering::Acquire),
                "Video stream closed"
            );
        }
    }

    fn record_error(&self, message: String) {
        if self.destroyed.load(Ordering::Acquire) {
            tracing::debug!(error = %message, "Ignoring stream error after destroy");
            return;
        }
        tracing::warn!(error = %message, "Video stream error");
        if let Ok(mut slot) = self.error.lock() {
            slot.get_or_insert(message);
        }
    }
}

/// Control side of an open `MediaStream`, usable after the stream itself has
/// been handed to a sink.
#[derive(Clone)]
pub struct RelayHandle {
    shared: Arc<RelayShared>,
}

impl RelayHandle {
    /// Terminate the stream early. Idempotent; returns true only for the call
    /// that actually destroyed it.
    pub fn destroy(&self) -> bool {
        self.shared.destroy_requests.fetch_add(1, Ordering::AcqRel);
        if self.shared.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!("Destroying video stream");
        self.shared.waker.wake();
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::Acquire)
    }

    /// True once the body ended, failed, was destroyed and polled, or dropped
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn bytes_read(&self) -> u64 {
        self.shared.bytes_read.load(Ordering::Acquire)
    }

    /// How many times `destroy` was called, effective or not
    pub fn destroy_requests(&self) -> usize {
        self.shared.destroy_requests.load(Ordering::Acquire)
    }

    /// First source read error, unless it happened after a destroy
    pub fn error(&self) -> Option<String> {
        self.shared.error.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Streamed body of the media response.
///
/// Yields chunks as they arrive. After `destroy` it yields one
/// `ConnectionAborted` error, so a sink never mistakes the cut for a
/// complete file, then ends.
pub struct MediaStream {
    // Only touched through `get_mut`; the mutex makes the stream `Sync` for
    // HTTP body wrappers
    body: Mutex<Option<SourceBody>>,
    shared: Arc<RelayShared>,
    content_length: Option<u64>,
}

impl MediaStream {
    pub fn new<S>(body: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Mutex::new(Some(Box::pin(body))),
            shared: Arc::new(RelayShared::default()),
            content_length,
        }
    }

    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Length announced by the media host, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

impl Stream for MediaStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let shared = &this.shared;
        let slot = this.body.get_mut().unwrap_or_else(|e| e.into_inner());

        shared.waker.register(cx.waker());

        if shared.destroyed.load(Ordering::Acquire) {
            if slot.take().is_some() {
                shared.close();
                return Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "video stream destroyed",
                ))));
            }
            return Poll::Ready(None);
        }

        let Some(body) = slot.as_mut() else {
            return Poll::Ready(None);
        };

        match body.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                shared
                    .bytes_read
                    .fetch_add(chunk.len() as u64, Ordering::AcqRel);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                *slot = None;
                let message = describe_error(&e);
                shared.record_error(message.clone());
                shared.close();
                Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::Other, message))))
            }
            Poll::Ready(None) => {
                *slot = None;
                shared.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.shared.close();
    }
}

pub struct StreamRelay {
    client: reqwest::Client,
}

impl StreamRelay {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Open a streamed GET on the media URL.
    ///
    /// `deadline` bounds the wait for the response head; on expiry the
    /// in-flight attempt is dropped. A non-success status fails before any
    /// body byte is read.
    pub async fn open_stream(&self, media_url: &str, deadline: Duration) -> Result<MediaStream, RelayError> {
        let request = self.client.get(media_url).send();

        let response = match tokio::time::timeout(deadline, request).await {
            Err(_) => {
                tracing::warn!(deadline_secs = deadline.as_secs(), "Request timeout opening video stream");
                return Err(RelayError::Timeout(deadline.as_secs()));
            }
            Ok(Err(e)) => return Err(RelayError::Connect(describe_error(&e))),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        let content_length = response.content_length();
        tracing::debug!(content_length = ?content_length, "Video stream opened");

        Ok(MediaStream::new(response.bytes_stream(), content_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static {
        futures::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(*p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_yields_chunks_and_counts_bytes() {
        let mut stream = MediaStream::new(chunks(&[&b"abc"[..], &b"defg"[..]]), Some(7));
        let handle = stream.handle();

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(collected, b"abcdefg");
        assert_eq!(handle.bytes_read(), 7);
        assert!(handle.is_closed());
        assert!(!handle.is_destroyed());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_aborts_once() {
        let mut stream = MediaStream::new(chunks(&[&b"abc"[..], &b"def"[..]]), None);
        let handle = stream.handle();

        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        assert!(handle.destroy());
        assert!(!handle.destroy());
        assert_eq!(handle.destroy_requests(), 2);

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(stream.next().await.is_none());
        assert!(handle.is_closed());
        assert_eq!(handle.bytes_read(), 3);
        assert!(handle.error().is_none());
    }

    #[tokio::test]
    async fn test_destroy_wakes_pending_read() {
        let mut stream = MediaStream::new(futures::stream::pending(), None);
        let handle = stream.handle();

        let reader = async move { stream.next().await };
        let destroyer = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.destroy();
        };
        let (next, ()) = tokio::join!(reader, destroyer);

        assert!(matches!(next, Some(Err(ref e)) if e.kind() == io::ErrorKind::ConnectionAborted));
    }

    #[tokio::test]
    async fn test_drop_closes() {
        let stream = MediaStream::new(chunks(&[&b"abc"[..]]), None);
        let handle = stream.handle();
        drop(stream);
        assert!(handle.is_closed());
        assert!(!handle.is_destroyed());
    }

    #[tokio::test]
    async fn test_open_streams_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/video.mp4")
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let relay = StreamRelay::new(reqwest::Client::new());
        let mut stream = relay
            .open_stream(&format!("{}/video.mp4", server.url()), Duration::from_secs(5))
            .await
            .unwrap();
        let handle = stream.handle();

        let mut total = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, 4096);
        assert_eq!(handle.bytes_read(), 4096);
    }

    #[tokio::test]
    async fn test_open_fails_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/video.mp4")
            .with_status(403)
            .with_body("expired")
            .create_async()
            .await;

        let relay = StreamRelay::new(reqwest::Client::new());
        let result = relay
            .open_stream(&format!("{}/video.mp4", server.url()), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(RelayError::Status(403))));
    }

    #[tokio::test]
    async fn test_open_times_out() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });

        let relay = StreamRelay::new(reqwest::Client::new());
        let result = relay
            .open_stream(&format!("http://{}/video.mp4", addr), Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(RelayError::Timeout(_))));
    }
}
