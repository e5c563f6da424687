use std::{fs, path::PathBuf};

use tracing::info;

use crate::{
    control::Actuator,
    error::{PeripheralInitFault, TransmissionFault},
};

/// Pushes actuator transitions out to the physical (or simulated) lines.
pub trait ActuatorDriver: Send {
    fn drive(&mut self, actuator: Actuator, on: bool) -> Result<(), TransmissionFault>;
}

/// Only records transitions.
#[derive(Debug, Default)]
pub struct LogDriver;

impl ActuatorDriver for LogDriver {
    fn drive(&mut self, actuator: Actuator, on: bool) -> Result<(), TransmissionFault> {
        info!("{actuator} -> {}", if on { "ON" } else { "OFF" });
        Ok(())
    }
}

/// Writes `1`/`0` to `<dir>/<actuator>`, like a sysfs GPIO `value` file.
#[derive(Debug)]
pub struct FileDriver {
    dir: PathBuf,
}

impl FileDriver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Like [`FileDriver::new`], but fails unless `dir` is an existing directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PeripheralInitFault> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(PeripheralInitFault::new(
                format!("actuator lines {}", dir.display()),
                "not a directory",
            ));
        }
        Ok(Self { dir })
    }

    pub fn path(&self, actuator: Actuator) -> PathBuf {
        self.dir.join(actuator.as_str())
    }
}

impl ActuatorDriver for FileDriver {
    fn drive(&mut self, actuator: Actuator, on: bool) -> Result<(), TransmissionFault> {
        let path = self.path(actuator);
        fs::write(&path, if on { "1\n" } else { "0\n" })
            .map_err(|e| TransmissionFault::new(format!("actuator {actuator}"), e))?;
        info!("{actuator} -> {} ({path:?})", if on { "ON" } else { "OFF" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_driver_writes_gpio_values() {
        let dir = std::env::temp_dir().join(format!("home-telemetry-gpio-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let mut driver = FileDriver::open(&dir).unwrap();
        driver.drive(Actuator::Fan, true).unwrap();
        driver.drive(Actuator::Light, false).unwrap();

        assert_eq!(fs::read_to_string(dir.join("fan")).unwrap(), "1\n");
        assert_eq!(fs::read_to_string(dir.join("light")).unwrap(), "0\n");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn open_requires_directory() {
        assert!(FileDriver::open("/nonexistent/home-telemetry/gpio").is_err());
    }

    #[test]
    fn file_driver_reports_missing_directory() {
        let mut driver = FileDriver::new("/nonexistent/home-telemetry/gpio");
        let fault = driver.drive(Actuator::Relay, true).unwrap_err();
        assert_eq!(fault.sink, "actuator relay");
    }
}
