use std::time::Duration;

use anyhow::{Context as _, Result, anyhow, bail};
use tokio::{io::AsyncWriteExt as _, net::TcpStream, time::timeout};
use tracing::debug;

use crate::{
    error::TransmissionFault,
    telemetry::{SendFuture, Sink, TelemetryRecord},
};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Streams records as JSON lines to a TCP collector.
///
/// A send makes at most `attempts` tries, each bounded by `timeout`, then
/// gives up. The connection is kept between records and dropped on error.
#[derive(Debug)]
pub struct NetworkSink {
    name: String,
    address: String,
    attempts: u32,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl NetworkSink {
    pub fn new(address: impl Into<String>, attempts: u32, timeout: Duration) -> Self {
        let address = address.into();
        Self {
            name: format!("network {address}"),
            address,
            attempts: attempts.max(1),
            timeout,
            stream: None,
        }
    }

    async fn try_send(&mut self, payload: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            let stream = timeout(self.timeout, TcpStream::connect(&self.address))
                .await
                .map_err(|_| anyhow!("connect timed out after {:?}", self.timeout))?
                .with_context(|| format!("failed to connect to {}", self.address))?;
            debug!("connected to {}", self.address);
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            bail!("no connection to {}", self.address);
        };

        timeout(self.timeout, stream.write_all(payload))
            .await
            .map_err(|_| anyhow!("write timed out after {:?}", self.timeout))?
            .context("failed to write record")?;

        Ok(())
    }
}

impl Sink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send<'a>(&'a mut self, record: &'a TelemetryRecord) -> SendFuture<'a> {
        Box::pin(async move {
            let mut payload = record
                .to_json()
                .map_err(|e| TransmissionFault::new(self.name.clone(), e))?;
            payload.push('\n');

            let mut last_error = None;
            for attempt in 1..=self.attempts {
                match self.try_send(payload.as_bytes()).await {
                    Ok(()) => return Ok(()),
                    Err(err) => {
                        debug!(
                            "{} attempt {attempt}/{} failed: {err:#}",
                            self.name, self.attempts
                        );
                        self.stream = None;
                        last_error = Some(err);
                    }
                }
            }

            let reason = match last_error {
                Some(err) => format!("gave up after {} attempts: {err:#}", self.attempts),
                None => format!("gave up after {} attempts", self.attempts),
            };
            Err(TransmissionFault::new(self.name.clone(), reason))
        })
    }
}
