use indexmap::IndexMap;

use crate::sensor::SensorKind;

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub name: String,

    pub kind: SensorKind,

    pub value: f32,

    /// Milliseconds since boot.
    pub tick: u64,
}

impl SensorReading {
    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }
}

/// Every configured sensor's reading for one cycle, in configuration order.
///
/// Only [`SensorPoller`](crate::sensor::SensorPoller) builds these, and only
/// once every sensor has produced a valid value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSet {
    tick: u64,
    readings: IndexMap<String, SensorReading>,
}

impl ReadingSet {
    pub(crate) fn from_validated(tick: u64, readings: IndexMap<String, SensorReading>) -> Self {
        Self { tick, readings }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn get(&self, name: &str) -> Option<&SensorReading> {
        self.readings.get(name)
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        self.readings.get(name).map(|r| r.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn for_test(tick: u64, values: &[(&str, SensorKind, f32)]) -> Self {
        let readings = values
            .iter()
            .map(|&(name, kind, value)| {
                (
                    name.to_string(),
                    SensorReading {
                        name: name.to_string(),
                        kind,
                        value,
                        tick,
                    },
                )
            })
            .collect();

        Self::from_validated(tick, readings)
    }
}
