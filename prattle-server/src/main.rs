//! Server entry point for prattle

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;

use prattle_core::config::ConfigLoader;
use prattle_core::logging::init_logging;
use prattle_core::session::SessionStore;
use prattle_providers::{Assistant, OpenAiClient};
use prattle_server::{run_server, AppState, ChatController};

#[derive(Parser)]
#[command(name = "prattle")]
#[command(about = "A tiny web chat that streams LLM replies")]
#[command(version)]
struct Cli {
    /// Configuration directory
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the conversations directory
    #[arg(long)]
    conversations_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;
    let _guard = init_logging(&config.logging);

    let conversations_dir = cli
        .conversations_dir
        .unwrap_or_else(|| PathBuf::from(&config.storage.conversations_dir));
    let store = SessionStore::new(conversations_dir);

    let api_key = if config.provider.api_key.is_empty() {
        None
    } else {
        Some(config.provider.api_key.clone())
    };
    let backend = OpenAiClient::new(
        api_key,
        Some(config.provider.api_base.clone()),
        config.provider.model.clone(),
        config.provider.max_tokens,
        config.provider.temperature,
    );
    let assistant = Assistant::new(Box::new(backend));

    let (chat_tx, chat_rx) = mpsc::channel(32);
    let controller = ChatController::new(store, assistant);
    tokio::spawn(controller.run(chat_rx));

    let host: std::net::IpAddr = config.server.host.parse()?;
    let port = cli.port.unwrap_or(config.server.port);
    run_server(AppState { chat_tx }, SocketAddr::new(host, port)).await
}
