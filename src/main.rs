mod cli;
mod crawl;
mod fetch;
mod report;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use crawler_core::{AppConfig, Fetcher};

use crate::cli::Cli;
use crate::fetch::HttpFetcher;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using bundled default");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;

    if let Ok(v) = std::env::var("WORKER_COUNT") {
        if let Ok(n) = v.parse::<usize>() {
            if n > 0 {
                config.general.worker_count = n;
            }
        }
    }
    if let Ok(v) = std::env::var("RESTART") {
        config.general.restart = v != "0" && v.to_lowercase() != "false";
    }

    let restart = cli.restart || config.general.restart;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);

    crawl::run(config, fetcher, restart, cli.seed).await
}
