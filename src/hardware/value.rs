//! Register and stack values with provenance.
//!
//! Every [`DataValue`] remembers when it was produced, whether it came straight
//! from the environment or a sensor, and the oldest origination time among all
//! values that were combined to build it.

use std::fmt;

/// Cycle stamp stored in a 14-bit field. Larger cycle counts saturate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Age(u16);

impl Age {
    pub const MAX: Age = Age(0x3FFF);

    pub fn new(cycle: u64) -> Self {
        if cycle >= Self::MAX.0 as u64 {
            Self::MAX
        } else {
            Age(cycle as u16)
        }
    }

    pub const fn get(self) -> u16 {
        self.0
    }

    pub const fn is_saturated(self) -> bool {
        self.0 == Self::MAX.0
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataValue {
    pub value: i32,
    /// Cycle at which this value was written.
    pub originated: Age,
    pub from_env: bool,
    pub from_sensor: bool,
    /// Minimum origination time over every value this one was built from.
    pub oldest_component: Age,
    /// Some ancestor value came from an environment input.
    pub env_component: bool,
    /// Some ancestor value came from a sensor read.
    pub sensor_component: bool,
}

impl DataValue {
    /// A value computed from nothing (constants, random numbers, head positions).
    pub fn fresh(value: i32, now: Age) -> Self {
        Self {
            value,
            originated: now,
            from_env: false,
            from_sensor: false,
            oldest_component: now,
            env_component: false,
            sensor_component: false,
        }
    }

    /// A value read from the environment's input buffer.
    pub fn from_env(value: i32, now: Age) -> Self {
        Self {
            from_env: true,
            env_component: true,
            ..Self::fresh(value, now)
        }
    }

    /// A value read from a sensor.
    pub fn from_sensor(value: i32, now: Age) -> Self {
        Self {
            from_sensor: true,
            sensor_component: true,
            ..Self::fresh(value, now)
        }
    }

    /// A value computed from a single operand; keeps the operand's ancestry.
    pub fn derived(value: i32, now: Age, src: &DataValue) -> Self {
        Self {
            value,
            originated: now,
            from_env: false,
            from_sensor: false,
            oldest_component: src.oldest_component,
            env_component: src.env_component,
            sensor_component: src.sensor_component,
        }
    }

    /// A value computed from two operands; merges both ancestries.
    pub fn combined(value: i32, now: Age, a: &DataValue, b: &DataValue) -> Self {
        Self {
            value,
            originated: now,
            from_env: false,
            from_sensor: false,
            oldest_component: a.oldest_component.min(b.oldest_component),
            env_component: a.env_component || b.env_component,
            sensor_component: a.sensor_component || b.sensor_component,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>11} (orig {}, oldest {}{}{})",
            self.value,
            self.originated,
            self.oldest_component,
            if self.env_component { ", env" } else { "" },
            if self.sensor_component { ", sensor" } else { "" },
        )
    }
}
