mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mobprice")]
#[command(about = "Show mobile-only Booking.com prices on the desktop page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print which page layout a URL is
    Classify { url: String },
    /// Extract mobile-only deals for a URL and print them as JSON
    Extract {
        url: String,
        /// Read the mobile document from a file instead of fetching it
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Annotate the desktop page for a URL with mobile-only prices
    Annotate {
        url: String,
        /// Read the desktop document from a file instead of fetching it
        #[arg(long)]
        desktop_file: Option<PathBuf>,
        /// Write the annotated HTML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = mobprice_core::load_overlay_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.default_log_filter()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Classify { url } => {
            println!("{}", commands::classify(&url));
            Ok(())
        }
        Commands::Extract { url, html_file } => {
            let json = commands::run_extract(&config, &url, html_file.as_deref()).await?;
            println!("{json}");
            Ok(())
        }
        Commands::Annotate {
            url,
            desktop_file,
            out,
        } => {
            let local = tokio::task::LocalSet::new();
            local
                .run_until(commands::run_annotate(
                    config,
                    &url,
                    desktop_file.as_deref(),
                    out.as_deref(),
                ))
                .await
        }
    }
}

#[cfg(test)]
mod tests;
