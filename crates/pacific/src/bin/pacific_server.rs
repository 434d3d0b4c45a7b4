//! PACIFIC REST Server
//!
//! Serves MoSCoW-prioritized lesson generation, conversation simulation and
//! learner profiles over HTTP.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use pacific::{start_server, ServerArgs};

#[derive(Parser)]
#[command(name = "pacific_server")]
#[command(about = "PACIFIC lesson generation REST API server")]
#[command(version)]
struct Args {
  #[command(flatten)]
  server: ServerArgs,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  // RUST_LOG wins over both presets
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if args.verbose {
      EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
      EnvFilter::new("pacific=info,lessons=info,tower_http=warn,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  let config = args.server.resolve()?;
  info!(bind = %config.bind, store = ?config.store, "configuration loaded");

  start_server(config).await?;

  Ok(())
}
