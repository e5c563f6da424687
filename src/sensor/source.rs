use std::{fs, path::PathBuf};

use anyhow::{Context as _, Result, bail};

/// Where a sensor's raw numbers come from.
pub trait SensorSource: Send {
    /// Checked once before the station starts; an error here is fatal.
    fn probe(&mut self) -> Result<()>;

    /// One raw reading. May be NaN; validation happens in the poller.
    fn read(&mut self) -> Result<f32>;
}

/// Reads a single number from a file, sysfs style
/// (e.g. `/sys/class/thermal/thermal_zone0/temp`, in millidegrees).
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    scale: f32,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, scale: f32) -> Self {
        Self {
            path: path.into(),
            scale,
        }
    }
}

impl SensorSource for FileSource {
    fn probe(&mut self) -> Result<()> {
        fs::metadata(&self.path)
            .with_context(|| format!("sensor file not accessible: {:?}", self.path))?;
        Ok(())
    }

    fn read(&mut self) -> Result<f32> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read sensor file: {:?}", self.path))?;
        let value: f32 = raw
            .trim()
            .parse()
            .with_context(|| format!("failed to parse sensor value: {:?}", raw.trim()))?;

        Ok(value * self.scale)
    }
}

/// Replays a fixed list of values, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<f32>,
    next: usize,
}

impl ScriptedSource {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, next: 0 }
    }
}

impl SensorSource for ScriptedSource {
    fn probe(&mut self) -> Result<()> {
        if self.values.is_empty() {
            bail!("scripted source has no values");
        }
        Ok(())
    }

    fn read(&mut self) -> Result<f32> {
        if self.values.is_empty() {
            bail!("scripted source has no values");
        }

        let value = self.values[self.next % self.values.len()];
        self.next = self.next.wrapping_add(1);

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_wraps() {
        let mut source = ScriptedSource::new(vec![1.0, 2.0]);
        let read: Vec<f32> = (0..5).map(|_| source.read().unwrap()).collect();
        assert_eq!(read, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn empty_script_fails_probe() {
        assert!(ScriptedSource::new(vec![]).probe().is_err());
    }

    #[test]
    fn file_source_scales_millidegrees() {
        let path = std::env::temp_dir().join(format!(
            "home-telemetry-file-source-{}",
            std::process::id()
        ));
        fs::write(&path, "32500\n").unwrap();

        let mut source = FileSource::new(&path, 0.001);
        source.probe().unwrap();
        let value = source.read().unwrap();
        fs::remove_file(&path).unwrap();

        assert!((value - 32.5).abs() < 1e-3);
    }

    #[test]
    fn file_source_rejects_garbage() {
        let path = std::env::temp_dir().join(format!(
            "home-telemetry-file-source-garbage-{}",
            std::process::id()
        ));
        fs::write(&path, "not a number").unwrap();

        let mut source = FileSource::new(&path, 1.0);
        let result = source.read();
        fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn missing_file_fails_probe() {
        let mut source = FileSource::new("/nonexistent/home-telemetry/value", 1.0);
        assert!(source.probe().is_err());
    }
}
