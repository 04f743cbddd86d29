use anyhow::Context;
use clap::{Parser, Subcommand};
use loom_transfer::transfer::Credential;
use loom_transfer::{get_video_details, init_tracing, transfer_video, AppConfig, TransferOrchestrator, TransferRequest};
use serde::Serialize;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "loom-transfer", version, about = "Stream Loom videos into Google Drive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show title, duration and size of a Loom video
    Details {
        /// Loom share URL
        url: String,
    },
    /// Stream a Loom video into Google Drive
    Transfer {
        /// Loom share URL
        url: String,
        /// Google OAuth access token with Drive scope
        #[arg(long, env = "LOOM_TRANSFER_DRIVE_TOKEN", hide_env_values = true)]
        token: String,
        /// File name in Drive (defaults to "<title>.mp4")
        #[arg(long)]
        name: Option<String>,
        /// Destination folder id
        #[arg(long)]
        folder: Option<String>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize result")?;
    println!("{}", out);
    Ok(())
}

/// 0 on success, 1 for caller errors, 2 for upstream or upload failures,
/// 130 when interrupted
fn exit_code(status: u16) -> ExitCode {
    match status {
        200..=299 => ExitCode::SUCCESS,
        499 => ExitCode::from(130),
        400..=498 => ExitCode::from(1),
        _ => ExitCode::from(2),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Invalid LOOM_TRANSFER_* configuration")?;
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let orchestrator = TransferOrchestrator::from_config(&config).context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Details { url } => match get_video_details(&orchestrator, &url).await {
            Ok(details) => {
                print_json(&details)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                let kind = e.kind();
                print_json(&serde_json::json!({ "success": false, "message": e.to_string(), "failure": kind }))?;
                Ok(exit_code(kind.status_code()))
            }
        },
        Commands::Transfer {
            url,
            token,
            name,
            folder,
        } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, cancelling transfer");
                    on_interrupt.cancel();
                }
            });

            let request = TransferRequest {
                source_url: url,
                destination_name: name,
                credential: Credential::new(token),
                destination_folder_id: folder,
            };

            let result = transfer_video(&orchestrator, request, cancel).await;
            print_json(&result)?;
            Ok(exit_code(result.status_code()))
        }
    }
}
