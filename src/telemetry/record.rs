use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    control::{Actuator, DeviceState},
    sensor::ReadingSet,
};

/// One cycle's readings plus the actuator snapshot taken for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub station: String,

    pub tick: u64,

    pub recorded_at: DateTime<FixedOffset>,

    pub readings: IndexMap<String, f32>,

    #[serde(default)]
    pub units: IndexMap<String, String>,

    pub state: DeviceState,
}

impl TelemetryRecord {
    /// Built from a complete [`ReadingSet`] only; there is no way to make a
    /// record out of a partial read.
    pub fn new(
        station: impl Into<String>,
        readings: &ReadingSet,
        state: DeviceState,
        recorded_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            station: station.into(),
            tick: readings.tick(),
            recorded_at,
            readings: readings.iter().map(|r| (r.name.clone(), r.value)).collect(),
            units: readings
                .iter()
                .map(|r| (r.name.clone(), r.unit().to_string()))
                .collect(),
            state,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// `tick=1234 temperature=32.00°C humidity=40.00% | fan=on light=off relay=off lock=off`
    pub fn to_line(&self) -> String {
        let mut line = format!("tick={}", self.tick);
        for (name, value) in self.readings.iter() {
            let unit = self.units.get(name).map(String::as_str).unwrap_or("");
            let _ = write!(line, " {name}={value:.2}{unit}");
        }
        line.push_str(" |");
        for actuator in Actuator::ALL {
            let state = if self.state.get(actuator) { "on" } else { "off" };
            let _ = write!(line, " {actuator}={state}");
        }
        line
    }

    pub fn csv_header(&self) -> Vec<String> {
        ["station", "tick", "recorded_at"]
            .into_iter()
            .map(String::from)
            .chain(self.readings.keys().cloned())
            .chain(Actuator::ALL.iter().map(|a| a.as_str().to_string()))
            .collect()
    }

    pub fn csv_row(&self) -> Vec<String> {
        [
            self.station.clone(),
            self.tick.to_string(),
            self.recorded_at.to_rfc3339(),
        ]
        .into_iter()
        .chain(self.readings.values().map(|v| v.to_string()))
        .chain(
            Actuator::ALL
                .iter()
                .map(|&a| if self.state.get(a) { "1" } else { "0" }.to_string()),
        )
        .collect()
    }
}
