use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, anyhow, bail};
use serde::Deserialize;
use tokio::io::AsyncWriteExt as _;
use tracing::info;

use crate::{
    error::{PeripheralInitFault, TransmissionFault},
    telemetry::{SendFuture, Sink, TelemetryRecord},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Csv,
    Jsonl,
}

/// Append-only record log on local storage.
///
/// With `max_bytes` set, the file is moved to `<path>.1` before an append
/// would push it past the limit; only one old generation is kept.
///
/// A CSV log holds one column layout. A record whose sensors differ from the
/// header already in the file is refused; use `jsonl` for mixed layouts.
#[derive(Debug)]
pub struct LogSink {
    name: String,
    path: PathBuf,
    format: LogFormat,
    max_bytes: Option<u64>,
    header: Option<Vec<String>>,
}

impl LogSink {
    pub fn open(
        path: impl Into<PathBuf>,
        format: LogFormat,
        max_bytes: Option<u64>,
    ) -> Result<Self, PeripheralInitFault> {
        let path = path.into();
        let name = format!("log {}", path.display());

        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PeripheralInitFault::new(name.clone(), e))?;

        let header = match format {
            LogFormat::Csv => read_header(&path).map_err(|e| {
                PeripheralInitFault::new(name.clone(), format!("{e:#}"))
            })?,
            LogFormat::Jsonl => None,
        };

        Ok(Self {
            name,
            path,
            format,
            max_bytes,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&mut self, record: &TelemetryRecord) -> Result<()> {
        let current_len = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if current_len == 0 {
            self.header = None;
        }

        let header = match self.format {
            LogFormat::Csv => Some(record.csv_header()),
            LogFormat::Jsonl => None,
        };
        if let (Some(existing), Some(header)) = (&self.header, &header)
            && existing != header
        {
            bail!(
                "record columns [{}] do not match log header [{}]",
                header.join(","),
                existing.join(",")
            );
        }

        let mut bytes = self.encode(record, current_len == 0)?;

        if let Some(max_bytes) = self.max_bytes
            && current_len > 0
            && current_len + bytes.len() as u64 > max_bytes
        {
            let rotated = rotated_path(&self.path);
            tokio::fs::rename(&self.path, &rotated)
                .await
                .with_context(|| format!("failed to rotate {:?} to {:?}", self.path, rotated))?;
            info!("rotated {:?} to {:?}", self.path, rotated);
            bytes = self.encode(record, true)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {:?}", self.path))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("failed to append to {:?}", self.path))?;
        file.flush()
            .await
            .with_context(|| format!("failed to flush {:?}", self.path))?;

        self.header = header;
        Ok(())
    }

    fn encode(&self, record: &TelemetryRecord, with_header: bool) -> Result<Vec<u8>> {
        match self.format {
            LogFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(Vec::new());
                if with_header {
                    writer
                        .write_record(record.csv_header())
                        .context("failed to encode CSV header")?;
                }
                writer
                    .write_record(record.csv_row())
                    .context("failed to encode CSV row")?;
                writer
                    .into_inner()
                    .map_err(|e| anyhow!("failed to flush CSV row: {}", e.error()))
            }
            LogFormat::Jsonl => {
                let mut line = record.to_json().context("failed to encode record")?;
                line.push('\n');
                Ok(line.into_bytes())
            }
        }
    }
}

impl Sink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a mut self, record: &'a TelemetryRecord) -> SendFuture<'a> {
        Box::pin(async move {
            self.append(record)
                .await
                .map_err(|e| TransmissionFault::new(self.name.clone(), format!("{e:#}")))
        })
    }
}

/// First row of an existing CSV log, if there is one.
fn read_header(path: &Path) -> Result<Option<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to read {path:?}"))?;

    match reader.records().next() {
        Some(row) => {
            let row = row.with_context(|| format!("failed to read CSV header of {path:?}"))?;
            Ok(Some(row.iter().map(String::from).collect()))
        }
        None => Ok(None),
    }
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut rotated = path.as_os_str().to_owned();
    rotated.push(".1");
    PathBuf::from(rotated)
}
