mod args;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use home_telemetry::{
    command::{command_queue, serve_commands},
    config::Config,
    control::SharedDeviceState,
    station::Station,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config: {:?}", args.config))?;

    let state = SharedDeviceState::default();
    let (commands, command_rx) = command_queue();

    let station = Station::from_config(&config, args.timezone, state.clone(), command_rx)
        .context("failed to initialize station")?;

    if let Some(addr) = args.command_listen {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind command listener: {addr}"))?;
        info!("accepting commands on {addr}");

        tokio::spawn(async move {
            if let Err(e) = serve_commands(listener, commands, state).await {
                error!("command listener stopped: {e:#}");
            }
        });
    }

    tokio::select! {
        _ = station.run(config.interval(), args.cycles) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("shutting down");
        }
    }

    Ok(())
}
