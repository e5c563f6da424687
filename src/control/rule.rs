use crate::control::Actuator;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Above(f32),
    Below(f32),
}

/// Switches one actuator on while one sensor is past a limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub sensor: String,

    pub actuator: Actuator,

    pub trigger: Trigger,

    /// Band the value must cross back through before an active rule releases.
    pub hysteresis: Option<f32>,
}

impl Rule {
    pub fn above(sensor: impl Into<String>, limit: f32, actuator: Actuator) -> Self {
        Self {
            sensor: sensor.into(),
            actuator,
            trigger: Trigger::Above(limit),
            hysteresis: None,
        }
    }

    pub fn below(sensor: impl Into<String>, limit: f32, actuator: Actuator) -> Self {
        Self {
            sensor: sensor.into(),
            actuator,
            trigger: Trigger::Below(limit),
            hysteresis: None,
        }
    }

    pub fn with_hysteresis(mut self, band: f32) -> Self {
        self.hysteresis = Some(band);
        self
    }

    /// Whether the rule wants its actuator on, given the actuator's current value.
    pub fn is_active(&self, value: f32, currently_on: bool) -> bool {
        let band = match self.hysteresis {
            Some(band) if currently_on => band,
            _ => 0.0,
        };

        match self.trigger {
            Trigger::Above(limit) => value > limit - band,
            Trigger::Below(limit) => value < limit + band,
        }
    }
}
