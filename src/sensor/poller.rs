use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{PeripheralInitFault, SensorFault, SensorFaultCause},
    filter::KalmanFilter,
    sensor::{ReadingSet, SensorKind, SensorReading, SensorSource},
};

pub struct Sensor {
    name: String,
    kind: SensorKind,
    range: (f32, f32),
    source: Box<dyn SensorSource>,
    filter: Option<KalmanFilter>,
}

impl Sensor {
    pub fn new(
        name: impl Into<String>,
        kind: SensorKind,
        source: impl SensorSource + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            range: kind.default_range(),
            source: Box::new(source),
            filter: None,
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = (min, max);
        self
    }

    pub fn with_smoothing(mut self, filter: KalmanFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    fn read_validated(&mut self) -> Result<f32, SensorFault> {
        let value = self
            .source
            .read()
            .map_err(|e| self.fault(SensorFaultCause::Unreadable(format!("{e:#}"))))?;

        if value.is_nan() {
            return Err(self.fault(SensorFaultCause::NotANumber));
        }

        let (min, max) = self.range;
        if !(min..=max).contains(&value) {
            return Err(self.fault(SensorFaultCause::OutOfRange { value, min, max }));
        }

        Ok(value)
    }

    fn fault(&self, cause: SensorFaultCause) -> SensorFault {
        SensorFault {
            sensor: self.name.clone(),
            kind: self.kind,
            cause,
        }
    }
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("range", &self.range)
            .field("smoothed", &self.filter.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct SensorPoller {
    sensors: Vec<Sensor>,
}

impl SensorPoller {
    /// Probes every sensor once. Any failure is fatal for the station.
    pub fn init(mut sensors: Vec<Sensor>) -> Result<Self, PeripheralInitFault> {
        for sensor in sensors.iter_mut() {
            sensor.source.probe().map_err(|e| {
                PeripheralInitFault::new(format!("sensor {}", sensor.name), format!("{e:#}"))
            })?;
            debug!("sensor {} ({}) ready", sensor.name, sensor.kind);
        }

        Ok(Self { sensors })
    }

    /// Reads every sensor. Either all readings are valid, or nothing is
    /// returned and no filter state is touched.
    pub fn poll(&mut self, tick: u64) -> Result<ReadingSet, SensorFault> {
        let mut raw = Vec::with_capacity(self.sensors.len());
        for sensor in self.sensors.iter_mut() {
            raw.push(sensor.read_validated()?);
        }

        let mut readings = IndexMap::with_capacity(self.sensors.len());
        for (sensor, raw) in self.sensors.iter_mut().zip(raw) {
            let value = match sensor.filter.as_mut() {
                Some(filter) => filter.update(raw),
                None => raw,
            };
            if !value.is_finite() {
                return Err(sensor.fault(SensorFaultCause::NotANumber));
            }
            let reading = SensorReading {
                name: sensor.name.clone(),
                kind: sensor.kind,
                value,
                tick,
            };
            readings.insert(sensor.name.clone(), reading);
        }

        Ok(ReadingSet::from_validated(tick, readings))
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ScriptedSource;

    fn poller(temperature: Vec<f32>, humidity: Vec<f32>) -> SensorPoller {
        SensorPoller::init(vec![
            Sensor::new(
                "temperature",
                SensorKind::Temperature,
                ScriptedSource::new(temperature),
            ),
            Sensor::new(
                "humidity",
                SensorKind::Humidity,
                ScriptedSource::new(humidity),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn complete_set_in_config_order() {
        let mut poller = poller(vec![21.0], vec![40.0]);
        let set = poller.poll(1000).unwrap();

        let names: Vec<&str> = set.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "humidity"]);
        assert_eq!(set.value("temperature"), Some(21.0));
        assert_eq!(set.get("humidity").unwrap().unit(), "%");
        assert_eq!(set.tick(), 1000);
    }

    #[test]
    fn nan_aborts_the_cycle() {
        let mut poller = poller(vec![21.0], vec![f32::NAN]);
        let fault = poller.poll(0).unwrap_err();

        assert_eq!(fault.sensor, "humidity");
        assert_eq!(fault.cause, SensorFaultCause::NotANumber);
    }

    #[test]
    fn out_of_range_aborts_the_cycle() {
        let mut poller = poller(vec![21.0], vec![140.0]);
        let fault = poller.poll(0).unwrap_err();

        assert!(matches!(
            fault.cause,
            SensorFaultCause::OutOfRange { value, .. } if value == 140.0
        ));
    }

    #[test]
    fn retries_on_next_tick() {
        let mut poller = poller(vec![f32::NAN, 22.0], vec![40.0]);
        assert!(poller.poll(0).is_err());
        assert_eq!(poller.poll(2000).unwrap().value("temperature"), Some(22.0));
    }

    #[test]
    fn range_override() {
        let mut poller = SensorPoller::init(vec![
            Sensor::new("gas", SensorKind::GasLevel, ScriptedSource::new(vec![1100.0]))
                .with_range(0.0, 1023.0),
        ])
        .unwrap();
        assert!(poller.poll(0).is_err());
    }

    #[test]
    fn fault_leaves_filter_untouched() {
        let mut poller = SensorPoller::init(vec![
            Sensor::new(
                "temperature",
                SensorKind::Temperature,
                ScriptedSource::new(vec![20.0, 30.0, 30.0]),
            )
            .with_smoothing(KalmanFilter::new(1.0, 0.1)),
            Sensor::new(
                "humidity",
                SensorKind::Humidity,
                ScriptedSource::new(vec![40.0, f32::NAN, 40.0]),
            ),
        ])
        .unwrap();

        assert_eq!(poller.poll(0).unwrap().value("temperature"), Some(20.0));
        assert!(poller.poll(1).is_err());

        let filter = poller.sensors[0].filter.as_ref().unwrap();
        assert_eq!(filter.estimate(), Some(20.0));
    }

    #[test]
    fn noiseless_smoothing_never_yields_nan() {
        let mut poller = SensorPoller::init(vec![
            Sensor::new(
                "temperature",
                SensorKind::Temperature,
                ScriptedSource::new(vec![20.0, 21.0, 22.0]),
            )
            .with_smoothing(KalmanFilter::new(0.0, 0.0)),
        ])
        .unwrap();

        for tick in 0..6 {
            let value = poller.poll(tick).unwrap().value("temperature").unwrap();
            assert!(value.is_finite(), "tick {tick}: {value}");
        }
    }

    #[test]
    fn unprobeable_sensor_is_an_init_fault() {
        let fault = SensorPoller::init(vec![Sensor::new(
            "temperature",
            SensorKind::Temperature,
            ScriptedSource::new(vec![]),
        )])
        .unwrap_err();

        assert_eq!(fault.peripheral, "sensor temperature");
    }
}
