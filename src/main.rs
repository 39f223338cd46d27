use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use handler::Cli;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

mod handler;
mod document;
mod chat;
mod error;
mod flashcard;
mod pipeline;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = read_config()?;
    let args = Cli::parse();
    handler::handler(args, config).await?;
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    bind_addr: String,
    max_upload_bytes: usize,

    // Storage
    sets_dir: PathBuf,

    // Chunk
    chunk_size: usize,
    max_cards: usize,
    concurrency: usize,
    max_input_chars: Option<usize>,

    // chat
    chat_url: String,
    chat_model: String,
    /// Name of the environment variable holding the API key.
    api_key_env: String,
    request_timeout_secs: u64,
    flashcard_temperature: f32,
    flashcard_max_tokens: u32,
    summary_max_tokens: u32,
    answer_max_tokens: u32,

    // Prompt
    flashcard_system_prompt: String,
    flashcard_prompt: String,
    summary_prompt: String,
    answer_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        let assist = pipeline::AssistConfig::default();
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            sets_dir: PathBuf::from("data/sets"),
            chunk_size: 3000,
            max_cards: 300,
            concurrency: 1,
            max_input_chars: None,
            chat_url: "https://api.openai.com/v1/chat/completions".to_string(),
            chat_model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 60,
            flashcard_temperature: 0.7,
            flashcard_max_tokens: 1500,
            summary_max_tokens: assist.summary_max_tokens,
            answer_max_tokens: assist.answer_max_tokens,
            flashcard_system_prompt: flashcard::prompt::DEFAULT_SYSTEM.to_string(),
            flashcard_prompt: flashcard::prompt::DEFAULT_USER.to_string(),
            summary_prompt: assist.summary_prompt,
            answer_prompt: assist.answer_prompt,
        }
    }
}

/// Defaults, then `config.toml` if present, then `FLASHDECK_*` environment variables.
fn read_config() -> anyhow::Result<Config> {
    Ok(config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("FLASHDECK"))
        .build()?
        .try_deserialize::<Config>()?)
}
