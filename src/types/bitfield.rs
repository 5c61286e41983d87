//! BitField type for the drone's error flag words

use serde::{Deserialize, Serialize};

use super::error_flags::{sensor, state};

/// A 32-bit flag word from an `Error` report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    /// Create a new BitField from a u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if a specific flag is set using a bitmask.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// True when no flag is raised.
    pub fn is_clear(&self) -> bool {
        self.0 == 0
    }

    /// Get the raw u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Convenience: the motion sensor is still calibrating.
pub fn motion_calibrating(sensor_flags: BitField) -> bool {
    sensor_flags.has_flag(sensor::MOTION_CALIBRATING)
}

/// Convenience: any sensor failed to answer.
pub fn sensor_unresponsive(sensor_flags: BitField) -> bool {
    sensor_flags.has_flag(
        sensor::MOTION_NO_ANSWER
            | sensor::PRESSURE_NO_ANSWER
            | sensor::RANGE_GROUND_NO_ANSWER
            | sensor::FLOW_NO_ANSWER,
    )
}

/// Convenience: the drone reports a low battery.
pub fn low_battery(state_flags: BitField) -> bool {
    state_flags.has_flag(state::LOW_BATTERY)
}
