use std::{fmt, str::FromStr};

use anyhow::{Error, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pressure,
    LightLevel,
    GasLevel,
    Motion,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Pressure => "pressure",
            SensorKind::LightLevel => "light_level",
            SensorKind::GasLevel => "gas_level",
            SensorKind::Motion => "motion",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Pressure => "hPa",
            SensorKind::LightLevel => "lx",
            SensorKind::GasLevel => "raw",
            SensorKind::Motion => "",
        }
    }

    /// Inclusive physical range a reading of this kind must fall in.
    pub fn default_range(&self) -> (f32, f32) {
        match self {
            // DHT22 / BME280 / DS18B20 operating envelope.
            SensorKind::Temperature => (-55.0, 125.0),
            SensorKind::Humidity => (0.0, 100.0),
            SensorKind::Pressure => (300.0, 1100.0),
            SensorKind::LightLevel => (0.0, 65535.0),
            SensorKind::GasLevel => (0.0, 65535.0),
            SensorKind::Motion => (0.0, 1.0),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            "pressure" => Ok(SensorKind::Pressure),
            "light_level" => Ok(SensorKind::LightLevel),
            "gas_level" => Ok(SensorKind::GasLevel),
            "motion" => Ok(SensorKind::Motion),
            _ => bail!("unknown sensor kind: {}", s),
        }
    }
}
