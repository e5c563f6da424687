use std::{net::SocketAddr, path::PathBuf};

use chrono_tz::Tz;
use clap::Parser;

/// Polls sensors, drives actuators and emits telemetry on a fixed cadence.
#[derive(Debug, Parser)]
pub struct Args {
    /// Station layout (TOML)
    #[arg(long, env = "STATION_CONFIG")]
    pub config: PathBuf,

    #[arg(long, env = "TZ", default_value = "UTC")]
    pub timezone: Tz,

    /// Accept text commands (`fan on`, `ARM`, `status`, ...) on this address
    #[arg(long, env = "STATION_COMMAND_LISTEN")]
    pub command_listen: Option<SocketAddr>,

    /// Stop after this many cycles
    #[arg(long)]
    pub cycles: Option<u64>,
}
