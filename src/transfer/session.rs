// Per-request transfer session

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::models::{DownloadDescriptor, Metadata, TransferRequest, TransferState, VideoReference};
use super::relay::RelayHandle;

/// Everything one transfer knows about itself. Created per request and
/// dropped when the orchestrator returns; nothing is shared across sessions.
pub struct TransferSession {
    pub(crate) request: TransferRequest,
    pub(crate) reference: Option<VideoReference>,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) descriptor: Option<DownloadDescriptor>,
    pub(crate) relay: Option<RelayHandle>,
    cancel: CancellationToken,
    state: watch::Sender<TransferState>,
}

impl TransferSession {
    pub fn new(request: TransferRequest) -> Self {
        Self::with_cancel_token(request, CancellationToken::new())
    }

    /// Attach an existing token, e.g. a child of a process-wide shutdown token
    pub fn with_cancel_token(request: TransferRequest, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(TransferState::Idle);
        Self {
            request,
            reference: None,
            metadata: None,
            descriptor: None,
            relay: None,
            cancel,
            state,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn state(&self) -> TransferState {
        *self.state.borrow()
    }

    /// Follow state transitions from another task
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.subscribe()
    }

    pub fn reference(&self) -> Option<&VideoReference> {
        self.reference.as_ref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Terminal states are absorbing
    pub(crate) fn advance(&self, next: TransferState) {
        let current = self.state();
        if current.is_terminal() {
            tracing::debug!(from = %current, to = %next, "Ignoring transition out of terminal state");
            return;
        }
        tracing::debug!(from = %current, to = %next, "Transfer state change");
        self.state.send_replace(next);
    }
}
