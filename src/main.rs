//! `cinehub` CLI - run the content API and resolve links from the shell

mod cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cinehub::HubConfig;

#[derive(Parser)]
#[command(name = "cinehub")]
#[command(about = "Content resolution hub: provider API, link extraction and media relay")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/cinehub/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Remote provider manifest URL
    #[arg(long, global = true)]
    manifest_url: Option<String>,

    /// Directory holding provider packages
    #[arg(long, global = true)]
    providers_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Print the provider manifest
    Providers {
        /// Include disabled providers
        #[arg(short, long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a link and print its direct media URL
    Resolve {
        /// Stream or hosting-page URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = HubConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.manifest_url {
        config.manifest.url = Some(url);
    }
    if let Some(dir) = cli.providers_dir {
        config.providers.dir = dir;
    }

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            cmd::serve::cmd_serve(config).await?;
        }
        Commands::Providers { all, json } => {
            cmd::providers::cmd_providers(&config, all, json).await?;
        }
        Commands::Resolve { url } => {
            cmd::resolve::cmd_resolve(&config, &url).await?;
        }
    }

    Ok(())
}
