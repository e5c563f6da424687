mod args;

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use home_telemetry::telemetry::{LogFormat, LogSink, Sink as _, TelemetryRecord};
use tokio::{
    io::{AsyncBufReadExt as _, BufReader},
    net::{TcpListener, TcpStream},
    sync::Mutex,
};
use tokio_stream::{StreamExt as _, wrappers::LinesStream};
use tracing::{error, info, warn};
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

    let log = match &args.log {
        Some(path) => {
            let format = if args.jsonl {
                LogFormat::Jsonl
            } else {
                LogFormat::Csv
            };
            let sink = LogSink::open(path, format, None).context("failed to open log")?;
            Some(Arc::new(Mutex::new(sink)))
        }
        None => None,
    };

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("listening on {}", args.listen);

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("failed to accept connection")?;
        info!("station connected from {peer}");

        let log = log.clone();
        tokio::spawn(async move {
            if let Err(e) = receive(stream, peer, log).await {
                warn!("connection {peer} closed with error: {e:#}");
            }
        });
    }
}

async fn receive(
    stream: TcpStream,
    peer: SocketAddr,
    log: Option<Arc<Mutex<LogSink>>>,
) -> Result<()> {
    let mut lines = LinesStream::new(BufReader::new(stream).lines());

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read line")?;

        let record = match TelemetryRecord::from_json(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("malformed record from {peer}: {e}");
                continue;
            }
        };
        info!("{} {}", record.station, record.to_line());

        if let Some(log) = &log
            && let Err(fault) = log.lock().await.send(&record).await
        {
            warn!("{fault}");
        }
    }

    info!("station {peer} disconnected");
    Ok(())
}
