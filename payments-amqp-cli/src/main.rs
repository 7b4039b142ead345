use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use clap::Parser;
use opts::{Command, Opts};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod command;
mod opts;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("PAYMENTS_LOG"))
        .init();

    let opts = Opts::parse();

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupted"),
                Err(e) => warn!("failed to listen for interruption: {e}"),
            }
            shutdown.cancel();
        }
    });

    match opts.command.clone() {
        Command::Declare => command::declare::start(opts).await,
        Command::Publish {
            exchange,
            routing_key,
            payload,
        } => command::publish::start(opts, exchange, routing_key, payload).await,
        Command::Listen { queue } => command::listen::start(opts, queue, shutdown).await,
    }
}
