mod display;
mod log;
mod network;

use std::{future::Future, pin::Pin};

use tracing::{debug, warn};

pub use display::*;
pub use log::*;
pub use network::*;

use crate::{error::TransmissionFault, telemetry::TelemetryRecord};

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransmissionFault>> + Send + 'a>>;

/// A destination for telemetry records.
pub trait Sink: Send {
    fn name(&self) -> &str;

    fn send<'a>(&'a mut self, record: &'a TelemetryRecord) -> SendFuture<'a>;
}

/// Outcome of handing one record to every sink.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<TransmissionFault>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends `record` to each sink in turn. A failing sink is logged and skipped;
/// it never keeps the record from the sinks after it.
pub async fn dispatch(sinks: &mut [Box<dyn Sink>], record: &TelemetryRecord) -> DispatchReport {
    let mut report = DispatchReport::default();

    for sink in sinks.iter_mut() {
        match sink.send(record).await {
            Ok(()) => {
                debug!("record {} delivered to {}", record.tick, sink.name());
                report.delivered.push(sink.name().to_string());
            }
            Err(fault) => {
                warn!("{fault}");
                report.failed.push(fault);
            }
        }
    }

    report
}
