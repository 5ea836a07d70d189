use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use serde_json::Value;

use chat_proxy::chat::ChatRequest;

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(about = "Send a chat request to a running chat proxy", long_about = None)]
struct Cli {
    /// Chat endpoint URL.
    #[arg(short, long, default_value = "http://localhost:8080/chat")]
    url: String,

    /// Prompt text.
    #[arg(short, long)]
    prompt: String,

    /// Image file to attach (sent as base64).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Audio file to attach (sent as base64).
    #[arg(long)]
    audio: Option<PathBuf>,
}

fn encode_file(path: Option<&PathBuf>) -> Result<Option<String>, std::io::Error> {
    path.map(|p| std::fs::read(p).map(|bytes| STANDARD.encode(bytes)))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let request = ChatRequest {
        prompt: cli.prompt,
        image_base64: encode_file(cli.image.as_ref())?,
        audio_base64: encode_file(cli.audio.as_ref())?,
    };

    let res = reqwest::Client::new()
        .post(&cli.url)
        .json(&request)
        .send()
        .await?;

    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
