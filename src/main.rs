mod aws;
mod cli;
mod config;
mod discovery;
mod events;
mod filter;
mod provider;
mod scanner;
mod sink;
mod types;

use std::collections::HashMap;
use std::path::Path;

use clap::Parser;
use tracing::info;

use cli::Cli;
use scanner::Scanner;
use sink::Sink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let env: HashMap<String, String> = std::env::vars().collect();
    let path = cli
        .config
        .or_else(|| env.get("CONFIG_FILE").cloned())
        .unwrap_or_else(|| "config.yaml".to_string());

    let raw = config::load_raw(Path::new(&path))?;
    let fallback_region = if raw.regions.is_empty() {
        aws::default_region().await
    } else {
        None
    };
    let config = config::resolve(raw, &env, fallback_region)?;

    let sink = Sink::from_config(&config.sink.kind, &config.sink.options)?;
    let clients = aws::resolve_clients(&config).await?;
    info!(
        "scanning {} account/region pairs every {}s",
        clients.len(),
        config.scan_interval
    );

    let scanner = Scanner::new(clients, config, sink);
    tokio::select! {
        _ = scanner.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, exiting");
        }
    }
    Ok(())
}
