use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    command::CommandReceiver,
    config::Config,
    control::{
        Actuator, ActuatorDriver, DeviceState, LogDriver, SharedDeviceState, ThresholdController,
    },
    error::{Fault, SensorFault},
    sensor::SensorPoller,
    telemetry::{DispatchReport, Sink, TelemetryRecord, dispatch},
};

/// Milliseconds elapsed since the station was built.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    boot: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            boot: Instant::now(),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// A sensor fault abandoned the cycle; nothing was emitted.
    Skipped(SensorFault),
    Emitted {
        record: TelemetryRecord,
        report: DispatchReport,
    },
}

/// Owns every peripheral handle and runs poll → control → format → transmit.
pub struct Station {
    name: String,
    timezone: Tz,
    uptime: Uptime,
    poller: SensorPoller,
    controller: ThresholdController,
    driver: Box<dyn ActuatorDriver>,
    sinks: Vec<Box<dyn Sink>>,
    state: SharedDeviceState,
    commands: CommandReceiver,
    driven: Option<DeviceState>,
}

impl Station {
    pub fn new(name: impl Into<String>, poller: SensorPoller, commands: CommandReceiver) -> Self {
        Self {
            name: name.into(),
            timezone: Tz::UTC,
            uptime: Uptime::start(),
            poller,
            controller: ThresholdController::default(),
            driver: Box::new(LogDriver),
            sinks: Vec::new(),
            state: SharedDeviceState::default(),
            commands,
            driven: None,
        }
    }

    /// Brings up every peripheral named in `config`. Any failure here is
    /// fatal; the caller must not enter the loop.
    pub fn from_config(
        config: &Config,
        timezone: Tz,
        state: SharedDeviceState,
        commands: CommandReceiver,
    ) -> Result<Self, Fault> {
        let poller = SensorPoller::init(config.build_sensors())?;
        let controller = ThresholdController::new(config.build_rules()?);
        let driver = config.build_driver()?;
        let sinks = config.build_sinks()?;

        let mut station = Station::new(&config.station, poller, commands)
            .with_controller(controller)
            .with_state(state)
            .with_timezone(timezone);
        station.driver = driver;
        station.sinks = sinks;

        info!(
            "station {} ready: {} sensors, {} rules, {} sinks",
            station.name,
            station.poller.sensors().count(),
            station.controller.rules().len(),
            station.sinks.len()
        );

        Ok(station)
    }

    pub fn with_controller(mut self, controller: ThresholdController) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_driver(mut self, driver: impl ActuatorDriver + 'static) -> Self {
        self.driver = Box::new(driver);
        self
    }

    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_state(mut self, state: SharedDeviceState) -> Self {
        self.state = state;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn state(&self) -> &SharedDeviceState {
        &self.state
    }

    /// Queued commands are applied first. Actuators are driven once per
    /// cycle, after the controller has had its say, so a command that a rule
    /// overrides never reaches the hardware.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.apply_commands();

        let readings = match self.poller.poll(self.uptime.ticks()) {
            Ok(readings) => readings,
            Err(fault) => {
                warn!("{fault}; skipping cycle");
                self.drive_changes();
                return CycleOutcome::Skipped(fault);
            }
        };

        let controller = &self.controller;
        self.state.update(|state| *state = controller.apply(&readings, state));
        self.drive_changes();

        let snapshot = self.state.snapshot();
        let recorded_at = Utc::now().with_timezone(&self.timezone).fixed_offset();
        let record = TelemetryRecord::new(&self.name, &readings, snapshot, recorded_at);
        debug!("{}", record.to_line());

        let report = dispatch(&mut self.sinks, &record).await;

        CycleOutcome::Emitted { record, report }
    }

    /// Runs cycles every `period`, forever or until `cycles` have completed.
    pub async fn run(mut self, period: Duration, cycles: Option<u64>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0u64;
        loop {
            ticker.tick().await;
            self.run_cycle().await;

            completed += 1;
            if cycles.is_some_and(|limit| completed >= limit) {
                info!("completed {completed} cycles");
                return;
            }
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            debug!("applying command {command:?}");
            self.state.update(|state| command.apply(state));
        }
    }

    fn drive_changes(&mut self) {
        let current = self.state.snapshot();
        let changes = match self.driven {
            Some(driven) => driven.changes(&current),
            None => Actuator::ALL
                .into_iter()
                .map(|a| (a, current.get(a)))
                .collect(),
        };

        for (actuator, on) in changes {
            if let Err(fault) = self.driver.drive(actuator, on) {
                warn!("{fault}");
            }
        }
        self.driven = Some(current);
    }
}
