//! Flag constants for the drone's `Error` report
//!
//! Sensor flags describe hardware that failed to answer or returned bad data;
//! state flags describe conditions that block or degrade flight.

// Sensor error flags
pub mod sensor {
    pub const MOTION_NO_ANSWER: u32 = 0x0000_0001;
    pub const MOTION_WRONG_VALUE: u32 = 0x0000_0002;
    pub const MOTION_NOT_CALIBRATED: u32 = 0x0000_0004;
    pub const MOTION_CALIBRATING: u32 = 0x0000_0008;

    pub const PRESSURE_NO_ANSWER: u32 = 0x0000_0010;
    pub const PRESSURE_WRONG_VALUE: u32 = 0x0000_0020;

    pub const RANGE_GROUND_NO_ANSWER: u32 = 0x0000_0100;
    pub const RANGE_GROUND_WRONG_VALUE: u32 = 0x0000_0200;

    pub const FLOW_NO_ANSWER: u32 = 0x0000_1000;
    pub const FLOW_WRONG_VALUE: u32 = 0x0000_2000;
    pub const FLOW_CANNOT_RECOGNIZE_GROUND_IMAGE: u32 = 0x0000_4000;
}

// State error flags
pub mod state {
    pub const NOT_REGISTERED: u32 = 0x0000_0001;
    pub const FLASH_READ_LOCK_UNLOCKED: u32 = 0x0000_0002;
    pub const BOOTLOADER_WRITE_LOCK_UNLOCKED: u32 = 0x0000_0004;
    pub const LOW_BATTERY: u32 = 0x0000_0008;

    pub const TAKEOFF_FAILURE_CHECK_PROPELLER_AND_MOTOR: u32 = 0x0000_0010;
    pub const CHECK_PROPELLER_VIBRATION: u32 = 0x0000_0020;
    pub const ATTITUDE_NOT_STABLE: u32 = 0x0000_0040;

    pub const CANNOT_FLIP_LOW_BATTERY: u32 = 0x0000_0100;
    pub const CANNOT_FLIP_TOO_HEAVY: u32 = 0x0000_0200;
}
