use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Receives JSON-line telemetry from stations over TCP.
#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "COLLECTOR_LISTEN", default_value = "0.0.0.0:7878")]
    pub listen: SocketAddr,

    /// Also append every record to this file. A CSV log takes one sensor
    /// layout; records from stations with other sensors are refused.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Write the log as JSON lines instead of CSV (needed for mixed stations)
    #[arg(long, requires = "log")]
    pub jsonl: bool,
}
