//! questctl - operator CLI for the quest progression ledger

use anyhow::Result;
use clap::Parser;
use quest_common::QuestConfig;
use questctl::{commands, output, Cli};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() {
    // Quiet by default; RUST_LOG=info shows engine logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        output::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = QuestConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.ledger {
        config.ledger.path = Some(path);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(&cli.command, &config, &mut out)
}
