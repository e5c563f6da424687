use std::{collections::HashSet, fs, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
    control::{Actuator, ActuatorDriver, FileDriver, LogDriver, Rule, Trigger},
    error::{ConfigError, PeripheralInitFault},
    filter::KalmanFilter,
    sensor::{FileSource, ScriptedSource, Sensor, SensorKind},
    telemetry::{self, DisplaySink, LogFormat, LogSink, NetworkSink, Sink},
};

/// Station layout, read from a TOML file.
///
/// ```toml
/// station = "greenhouse"
/// interval_ms = 2000
///
/// [[sensors]]
/// name = "temperature"
/// kind = "temperature"
/// source = { type = "file", path = "/sys/class/thermal/thermal_zone0/temp", scale = 0.001 }
/// smoothing = { process_noise = 0.01, measurement_noise = 1.0 }
///
/// [[rules]]
/// sensor = "temperature"
/// actuator = "fan"
/// above = 30.0
///
/// [actuators]
/// driver = "log"
///
/// [[sinks]]
/// type = "log"
/// path = "telemetry.csv"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub station: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    pub sensors: Vec<SensorConfig>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub actuators: ActuatorConfig,

    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorConfig {
    pub name: String,

    pub kind: SensorKind,

    pub source: SourceConfig,

    /// `[min, max]`, replacing the kind's default physical range.
    pub range: Option<[f32; 2]>,

    pub smoothing: Option<SmoothingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    File {
        path: PathBuf,
        #[serde(default = "default_scale")]
        scale: f32,
    },
    Scripted {
        values: Vec<f32>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmoothingConfig {
    pub process_noise: f32,
    pub measurement_noise: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub sensor: String,
    pub actuator: Actuator,
    pub above: Option<f32>,
    pub below: Option<f32>,
    pub hysteresis: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum ActuatorConfig {
    #[default]
    Log,
    File {
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Log {
        path: PathBuf,
        #[serde(default)]
        format: LogFormat,
        max_bytes: Option<u64>,
    },
    Display,
    Network {
        address: String,
        #[serde(default = "default_attempts")]
        attempts: u32,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_scale() -> f32 {
    1.0
}

fn default_attempts() -> u32 {
    telemetry::DEFAULT_ATTEMPTS
}

fn default_timeout_ms() -> u64 {
    telemetry::DEFAULT_TIMEOUT.as_millis() as u64
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(invalid("interval_ms must be greater than zero"));
        }
        if self.sensors.is_empty() {
            return Err(invalid("at least one sensor is required"));
        }

        let mut names = HashSet::new();
        for sensor in self.sensors.iter() {
            if !names.insert(sensor.name.as_str()) {
                return Err(invalid(format!("duplicate sensor name: {}", sensor.name)));
            }
            if let Some([min, max]) = sensor.range {
                if min.is_nan() || max.is_nan() {
                    return Err(invalid(format!("sensor {}: range must be numeric", sensor.name)));
                }
                if min > max {
                    return Err(invalid(format!("sensor {}: range min exceeds max", sensor.name)));
                }
            }
            if let Some(smoothing) = sensor.smoothing {
                smoothing.validate(&sensor.name)?;
            }
        }

        for sink in self.sinks.iter() {
            if let SinkConfig::Network {
                address,
                attempts,
                timeout_ms,
            } = sink
                && (*attempts == 0 || *timeout_ms == 0)
            {
                return Err(invalid(format!(
                    "network sink {address}: attempts and timeout_ms must be greater than zero"
                )));
            }
        }

        for rule in self.rules.iter() {
            if !names.contains(rule.sensor.as_str()) {
                return Err(invalid(format!("rule refers to unknown sensor: {}", rule.sensor)));
            }
            rule.build()?;
        }

        Ok(())
    }

    pub fn build_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        self.rules.iter().map(RuleConfig::build).collect()
    }

    pub fn build_sensors(&self) -> Vec<Sensor> {
        self.sensors.iter().map(SensorConfig::build).collect()
    }

    pub fn build_driver(&self) -> Result<Box<dyn ActuatorDriver>, PeripheralInitFault> {
        let driver: Box<dyn ActuatorDriver> = match &self.actuators {
            ActuatorConfig::Log => Box::new(LogDriver),
            ActuatorConfig::File { dir } => Box::new(FileDriver::open(dir)?),
        };
        Ok(driver)
    }

    pub fn build_sinks(&self) -> Result<Vec<Box<dyn Sink>>, PeripheralInitFault> {
        self.sinks
            .iter()
            .map(|sink| -> Result<Box<dyn Sink>, PeripheralInitFault> {
                let sink: Box<dyn Sink> = match sink {
                    SinkConfig::Log {
                        path,
                        format,
                        max_bytes,
                    } => Box::new(LogSink::open(path, *format, *max_bytes)?),
                    SinkConfig::Display => Box::new(DisplaySink::stdout()),
                    SinkConfig::Network {
                        address,
                        attempts,
                        timeout_ms,
                    } => Box::new(NetworkSink::new(
                        address.clone(),
                        *attempts,
                        Duration::from_millis(*timeout_ms),
                    )),
                };
                Ok(sink)
            })
            .collect()
    }
}

impl SensorConfig {
    fn build(&self) -> Sensor {
        let mut sensor = match &self.source {
            SourceConfig::File { path, scale } => {
                Sensor::new(&self.name, self.kind, FileSource::new(path, *scale))
            }
            SourceConfig::Scripted { values } => {
                Sensor::new(&self.name, self.kind, ScriptedSource::new(values.clone()))
            }
        };
        if let Some([min, max]) = self.range {
            sensor = sensor.with_range(min, max);
        }
        if let Some(smoothing) = self.smoothing {
            sensor = sensor.with_smoothing(KalmanFilter::new(
                smoothing.process_noise,
                smoothing.measurement_noise,
            ));
        }
        sensor
    }
}

impl SmoothingConfig {
    fn validate(&self, sensor: &str) -> Result<(), ConfigError> {
        if !self.process_noise.is_finite() || self.process_noise < 0.0 {
            return Err(invalid(format!(
                "sensor {sensor}: process_noise must be a non-negative number"
            )));
        }
        if !self.measurement_noise.is_finite() || self.measurement_noise <= 0.0 {
            return Err(invalid(format!(
                "sensor {sensor}: measurement_noise must be a positive number"
            )));
        }
        Ok(())
    }
}

impl RuleConfig {
    fn build(&self) -> Result<Rule, ConfigError> {
        let trigger = match (self.above, self.below) {
            (Some(limit), None) => Trigger::Above(limit),
            (None, Some(limit)) => Trigger::Below(limit),
            _ => {
                return Err(invalid(format!(
                    "rule for {} on {} needs exactly one of `above` or `below`",
                    self.actuator, self.sensor
                )));
            }
        };
        if let Some(band) = self.hysteresis
            && (band.is_nan() || band < 0.0)
        {
            return Err(invalid(format!(
                "rule for {} on {}: hysteresis must not be negative",
                self.actuator, self.sensor
            )));
        }

        Ok(Rule {
            sensor: self.sensor.clone(),
            actuator: self.actuator,
            trigger,
            hysteresis: self.hysteresis,
        })
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        station = "greenhouse"
        interval_ms = 500

        [[sensors]]
        name = "temperature"
        kind = "temperature"
        source = { type = "scripted", values = [21.0, 32.0, nan] }
        smoothing = { process_noise = 0.01, measurement_noise = 1.0 }

        [[sensors]]
        name = "gas"
        kind = "gas_level"
        source = { type = "file", path = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw" }
        range = [0.0, 4095.0]

        [[rules]]
        sensor = "temperature"
        actuator = "fan"
        above = 30.0
        hysteresis = 0.5

        [actuators]
        driver = "file"
        dir = "/tmp/gpio"

        [[sinks]]
        type = "log"
        path = "telemetry.jsonl"
        format = "jsonl"
        max_bytes = 1048576

        [[sinks]]
        type = "display"

        [[sinks]]
        type = "network"
        address = "collector.local:7878"
    "#;

    #[test]
    fn parses_full_example() {
        let config = Config::from_toml(EXAMPLE).unwrap();

        assert_eq!(config.station, "greenhouse");
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[1].kind, SensorKind::GasLevel);
        assert!(matches!(
            &config.sensors[1].source,
            SourceConfig::File { scale, .. } if *scale == 1.0
        ));
        assert!(matches!(
            &config.sensors[0].source,
            SourceConfig::Scripted { values } if values[2].is_nan()
        ));
        assert!(matches!(config.actuators, ActuatorConfig::File { .. }));
        assert_eq!(
            config.build_rules().unwrap(),
            vec![Rule::above("temperature", 30.0, Actuator::Fan).with_hysteresis(0.5)]
        );
        assert!(matches!(
            &config.sinks[2],
            SinkConfig::Network { attempts: 3, timeout_ms: 500, .. }
        ));
    }

    #[test]
    fn defaults() {
        let config = Config::from_toml(
            r#"
            station = "shed"
            [[sensors]]
            name = "motion"
            kind = "motion"
            source = { type = "scripted", values = [0.0] }
            "#,
        )
        .unwrap();

        assert_eq!(config.interval_ms, 2000);
        assert!(matches!(config.actuators, ActuatorConfig::Log));
        assert!(config.rules.is_empty());
        assert!(config.sinks.is_empty());
    }

    fn with_rule(rule: &str) -> Result<Config, ConfigError> {
        Config::from_toml(&format!(
            r#"
            station = "shed"
            [[sensors]]
            name = "temperature"
            kind = "temperature"
            source = {{ type = "scripted", values = [20.0] }}
            [[rules]]
            {rule}
            "#
        ))
    }

    #[test]
    fn rule_needs_exactly_one_trigger() {
        assert!(with_rule("sensor = \"temperature\"\nactuator = \"fan\"").is_err());
        assert!(
            with_rule("sensor = \"temperature\"\nactuator = \"fan\"\nabove = 1.0\nbelow = 0.0")
                .is_err()
        );
        assert!(with_rule("sensor = \"temperature\"\nactuator = \"fan\"\nbelow = 5.0").is_ok());
    }

    #[test]
    fn rule_must_name_a_known_sensor() {
        let err =
            with_rule("sensor = \"humidity\"\nactuator = \"fan\"\nabove = 80.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("humidity")));
    }

    #[test]
    fn unknown_actuator_is_a_parse_error() {
        let err =
            with_rule("sensor = \"temperature\"\nactuator = \"heater\"\nabove = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    fn with_sensor_line(line: &str) -> Result<Config, ConfigError> {
        Config::from_toml(&format!(
            r#"
            station = "shed"
            [[sensors]]
            name = "temperature"
            kind = "temperature"
            source = {{ type = "scripted", values = [20.0] }}
            {line}
            "#
        ))
    }

    #[test]
    fn smoothing_noise_must_be_usable() {
        for smoothing in [
            "{ process_noise = 0.0, measurement_noise = 0.0 }",
            "{ process_noise = -0.1, measurement_noise = 1.0 }",
            "{ process_noise = nan, measurement_noise = 1.0 }",
            "{ process_noise = 0.01, measurement_noise = inf }",
        ] {
            let err = with_sensor_line(&format!("smoothing = {smoothing}")).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(msg) if msg.contains("noise")),
                "{smoothing}: {err}"
            );
        }
        assert!(
            with_sensor_line("smoothing = { process_noise = 0.0, measurement_noise = 0.5 }")
                .is_ok()
        );
    }

    #[test]
    fn range_errors_name_the_cause() {
        let err = with_sensor_line("range = [nan, 50.0]").unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid(msg) if msg.contains("numeric")));

        let err = with_sensor_line("range = [50.0, 10.0]").unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid(msg) if msg.contains("min exceeds max")));
    }

    #[test]
    fn network_timeout_must_be_positive() {
        let err = with_sensor_line(
            "[[sinks]]\ntype = \"network\"\naddress = \"127.0.0.1:7878\"\ntimeout_ms = 0",
        )
        .unwrap_err();
        assert!(matches!(&err, ConfigError::Invalid(msg) if msg.contains("timeout_ms")));
    }

    #[test]
    fn duplicate_sensor_names_are_rejected() {
        let err = Config::from_toml(
            r#"
            station = "shed"
            [[sensors]]
            name = "t"
            kind = "temperature"
            source = { type = "scripted", values = [20.0] }
            [[sensors]]
            name = "t"
            kind = "humidity"
            source = { type = "scripted", values = [50.0] }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
