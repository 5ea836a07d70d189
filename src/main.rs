//! Multimodal chat proxy.
//!
//! ```text
//!  client ──POST {prompt, imageBase64?, audioBase64?}──▶ ┌────────────────┐
//!                                                        │  chat handler  │
//!                                                        │  validate      │──secret lookup──▶ env
//!                                                        │  build payload │
//!  client ◀──────────── {message} | {error, details?} ── │  normalise     │◀─chat/completions─▶ upstream LLM
//!                                                        └────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use chat_proxy::config::{load_config, load_from_env};
use chat_proxy::lifecycle::startup;
use chat_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "chat-proxy")]
#[command(about = "Multimodal chat proxy for an upstream LLM API", long_about = None)]
struct Args {
    /// TOML config file. Defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init(&config.observability.log_level);
    tracing::info!("chat-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.listener.path,
        endpoint = %config.upstream.endpoint,
        model = %config.upstream.model,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
