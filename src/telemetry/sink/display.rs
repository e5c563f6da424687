use std::io::{self, Write};

use crate::{
    control::Actuator,
    error::TransmissionFault,
    telemetry::{SendFuture, Sink, TelemetryRecord},
};

/// Text panel refreshed once per cycle; the terminal stands in for the
/// character LCD / OLED the stations used to drive.
pub struct DisplaySink<W> {
    out: W,
}

impl DisplaySink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> DisplaySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, record: &TelemetryRecord) -> io::Result<()> {
        writeln!(
            self.out,
            "== {} {} ==",
            record.station,
            record.recorded_at.format("%H:%M:%S")
        )?;
        for (name, value) in record.readings.iter() {
            let unit = record.units.get(name).map(String::as_str).unwrap_or("");
            writeln!(self.out, "{name:<16}{value:>10.2} {unit}")?;
        }
        let states: Vec<String> = Actuator::ALL
            .iter()
            .map(|&a| format!("{a}: {}", if record.state.get(a) { "ON" } else { "OFF" }))
            .collect();
        writeln!(self.out, "{}", states.join("  "))?;
        self.out.flush()
    }
}

impl<W: Write + Send> Sink for DisplaySink<W> {
    fn name(&self) -> &str {
        "display"
    }

    fn send<'a>(&'a mut self, record: &'a TelemetryRecord) -> SendFuture<'a> {
        Box::pin(async move {
            self.render(record)
                .map_err(|e| TransmissionFault::new("display", e))
        })
    }
}
