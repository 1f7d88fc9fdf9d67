//! Quest Daemon - progression engine service
//!
//! Records job-search events and serves XP, levels, badges and streaks.

use anyhow::Result;
use clap::Parser;
use quest_common::QuestConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "questd", version, about = "Quest progression daemon")]
struct Args {
    /// Config file (default: $QUEST_CONFIG, then /etc/quest/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Listen address, overrides [server].listen
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("Quest Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = QuestConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    questd::server::run(config).await
}
