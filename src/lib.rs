pub mod commands;
pub mod config;
pub mod telemetry;
pub mod transfer;

pub use commands::{get_video_details, transfer_video};
pub use config::AppConfig;
pub use telemetry::init_tracing;
pub use transfer::{TransferOrchestrator, TransferRequest, TransferResult};
