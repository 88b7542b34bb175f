use clap::Parser;

#[derive(Parser)]
#[command(name = "crawler", about = "Polite single-seed crawler for a fixed academic subdomain set")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Clear the persistent store and reseed before crawling
    #[arg(long)]
    pub restart: bool,

    /// Override the configured seed URL with a single seed
    #[arg(long)]
    pub seed: Option<String>,
}
