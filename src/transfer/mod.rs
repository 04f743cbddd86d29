// Transfer module - streaming pipeline from the source platform to cloud storage

pub mod errors;
pub mod extractors;
pub mod locator;
pub mod models;
pub mod orchestrator;
pub mod probe;
pub mod reference;
pub mod relay;
pub mod session;
pub mod storage;
pub mod utils;

pub use errors::{FailureKind, TransferError};
pub use models::{Credential, TransferRequest, TransferResult, TransferState, VideoDetails, VideoReference};
pub use orchestrator::TransferOrchestrator;
pub use relay::{MediaStream, RelayHandle};
pub use session::TransferSession;
pub use storage::{DestinationStorage, DriveStorage};
