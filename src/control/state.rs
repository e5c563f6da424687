use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Error, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Fan,
    Light,
    Relay,
    /// Door lock / security system; `true` means locked and armed.
    Lock,
}

impl Actuator {
    pub const ALL: [Actuator; 4] = [
        Actuator::Fan,
        Actuator::Light,
        Actuator::Relay,
        Actuator::Lock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Actuator::Fan => "fan",
            Actuator::Light => "light",
            Actuator::Relay => "relay",
            Actuator::Lock => "lock",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actuator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan" => Ok(Actuator::Fan),
            "light" => Ok(Actuator::Light),
            "relay" => Ok(Actuator::Relay),
            "lock" => Ok(Actuator::Lock),
            _ => bail!("unknown actuator: {}", s),
        }
    }
}

/// Commanded state of every actuator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub fan: bool,
    pub light: bool,
    pub relay: bool,
    pub lock: bool,
}

impl DeviceState {
    pub fn get(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Fan => self.fan,
            Actuator::Light => self.light,
            Actuator::Relay => self.relay,
            Actuator::Lock => self.lock,
        }
    }

    pub fn set(&mut self, actuator: Actuator, on: bool) {
        match actuator {
            Actuator::Fan => self.fan = on,
            Actuator::Light => self.light = on,
            Actuator::Relay => self.relay = on,
            Actuator::Lock => self.lock = on,
        }
    }

    /// Actuators whose value differs in `next`, with their new value.
    pub fn changes(&self, next: &DeviceState) -> Vec<(Actuator, bool)> {
        Actuator::ALL
            .into_iter()
            .filter(|&a| self.get(a) != next.get(a))
            .map(|a| (a, next.get(a)))
            .collect()
    }
}

/// `DeviceState` shared between the control loop and the command listener.
///
/// Every access holds the lock only long enough to copy or replace the whole
/// value, so readers always see a state some writer actually stored.
#[derive(Debug, Clone, Default)]
pub struct SharedDeviceState(Arc<Mutex<DeviceState>>);

impl SharedDeviceState {
    pub fn new(initial: DeviceState) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn snapshot(&self) -> DeviceState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, state: DeviceState) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Applies `f` under the lock and returns the (previous, new) pair.
    pub fn update(&self, f: impl FnOnce(&mut DeviceState)) -> (DeviceState, DeviceState) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *guard;
        f(&mut *guard);
        (previous, *guard)
    }
}
