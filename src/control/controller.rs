use crate::{
    control::{Actuator, DeviceState, Rule},
    sensor::ReadingSet,
};

/// Maps readings onto actuator states through a fixed list of rules.
///
/// Rules sharing an actuator are OR-ed. Actuators no rule mentions keep their
/// previous value. Without hysteresis a value hovering at a limit toggles its
/// actuator every cycle.
#[derive(Debug, Clone, Default)]
pub struct ThresholdController {
    rules: Vec<Rule>,
}

impl ThresholdController {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn apply(&self, readings: &ReadingSet, previous: &DeviceState) -> DeviceState {
        let mut next = *previous;

        for actuator in Actuator::ALL {
            let mut governed = false;
            let mut on = false;

            for rule in self.rules.iter().filter(|r| r.actuator == actuator) {
                let Some(value) = readings.value(&rule.sensor) else {
                    continue;
                };
                governed = true;
                on |= rule.is_active(value, previous.get(actuator));
            }

            if governed {
                next.set(actuator, on);
            }
        }

        next
    }
}
