//! product-lens - Multi-strategy product extraction CLI
//!
//! Extracts normalized product records from shop pages, saved or live.

use anyhow::Result;
use clap::{Parser, Subcommand};
use product_lens::commands::{ClassifyCommand, ExtractCommand, WatchCommand};
use product_lens::config::{Config, OutputFormat};
use product_lens::strategy::site::amazon::MARKETPLACES;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "product-lens",
    version,
    about = "Multi-strategy product extraction CLI",
    long_about = "Detects product pages and extracts a normalized product record using site, platform and generic strategies."
)]
struct Cli {
    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "LENS_PROXY")]
    proxy: Option<String>,

    /// Delay before each request in milliseconds
    #[arg(long, global = true, env = "LENS_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the product record from a URL or saved HTML file
    #[command(alias = "x")]
    Extract {
        /// http(s) URL or path to an HTML file
        source: String,

        /// Page URL to use for a saved file
        #[arg(long)]
        url: Option<String>,
    },

    /// Show the product page signals for a URL or saved HTML file
    #[command(alias = "c")]
    Classify {
        /// http(s) URL or path to an HTML file
        source: String,

        /// Page URL to use for a saved file
        #[arg(long)]
        url: Option<String>,
    },

    /// Re-detect a live URL until interrupted, one JSON record per line
    #[command(alias = "w")]
    Watch {
        /// Page URL
        url: String,
    },

    /// List supported Amazon marketplaces
    Marketplaces,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    match cli.command {
        Commands::Extract { source, url } => {
            let cmd = ExtractCommand::new(config);
            let output = cmd.execute(&source, url.as_deref()).await?;
            println!("{}", output);
        }

        Commands::Classify { source, url } => {
            let cmd = ClassifyCommand::new(config);
            let output = cmd.execute(&source, url.as_deref()).await?;
            println!("{}", output);
        }

        Commands::Watch { url } => {
            WatchCommand::new(config).execute(&url).await?;
        }

        Commands::Marketplaces => {
            println!("Supported Amazon marketplaces:\n");
            println!("{:<20} {:<10} {:<12}", "Domain", "Currency", "Decimals");
            println!("{:-<20} {:-<10} {:-<12}", "", "", "");

            for market in MARKETPLACES {
                println!("{:<20} {:<10} {:?}", market.domain, market.currency, market.convention);
            }
        }
    }

    Ok(())
}
