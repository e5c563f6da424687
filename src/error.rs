use std::path::PathBuf;

use thiserror::Error;

use crate::sensor::SensorKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorFaultCause {
    #[error("reading is not a number")]
    NotANumber,

    #[error("reading {value} outside physical range {min}..={max}")]
    OutOfRange { value: f32, min: f32, max: f32 },

    #[error("unreadable: {0}")]
    Unreadable(String),
}

/// A sensor produced an unusable reading; the cycle is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("sensor fault on {sensor} ({kind}): {cause}")]
pub struct SensorFault {
    pub sensor: String,
    pub kind: SensorKind,
    pub cause: SensorFaultCause,
}

/// A peripheral could not be brought up at startup. Fatal.
#[derive(Debug, Error)]
#[error("failed to initialize {peripheral}: {reason}")]
pub struct PeripheralInitFault {
    pub peripheral: String,
    pub reason: String,
}

/// A sink or actuator line could not be written. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("transmission to {sink} failed: {reason}")]
pub struct TransmissionFault {
    pub sink: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum Fault {
    #[error(transparent)]
    Sensor(#[from] SensorFault),

    #[error(transparent)]
    PeripheralInit(#[from] PeripheralInitFault),

    #[error(transparent)]
    Transmission(#[from] TransmissionFault),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TransmissionFault {
    pub fn new(sink: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

impl PeripheralInitFault {
    pub fn new(peripheral: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            peripheral: peripheral.into(),
            reason: reason.to_string(),
        }
    }
}
