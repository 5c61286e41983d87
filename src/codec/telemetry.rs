//! Payloads the drone and controller report back to the host.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::{WireFormat, fixed};
use crate::error::ProtocolError;
use crate::types::{
    BitField, ButtonEvent, DataType, Headless, JoystickDirection, JoystickEvent,
    ModeControlFlight, ModeFlight, ModeMovement, ModeSystem, ModeUpdate, SensorOrientation,
};

/// Barometer and downward range sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Altitude {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Pascals.
    pub pressure: f32,
    /// Meters above sea level, from pressure.
    pub altitude: f32,
    /// Meters above the ground, from the range sensor.
    pub range_height: f32,
}

impl WireFormat for Altitude {
    fn encoded_len(&self) -> usize {
        16
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.temperature);
        buf.put_f32_le(self.pressure);
        buf.put_f32_le(self.altitude);
        buf.put_f32_le(self.range_height);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 16)?;
        Ok(Self {
            temperature: buf.get_f32_le(),
            pressure: buf.get_f32_le(),
            altitude: buf.get_f32_le(),
            range_height: buf.get_f32_le(),
        })
    }
}

/// Optical-flow position estimate in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WireFormat for Position {
    fn encoded_len(&self) -> usize {
        12
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 12)?;
        Ok(Self { x: buf.get_f32_le(), y: buf.get_f32_le(), z: buf.get_f32_le() })
    }
}

/// Optical-flow velocity estimate. Shares the `Position` layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WireFormat for Flow {
    fn encoded_len(&self) -> usize {
        12
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 12)?;
        Ok(Self { x: buf.get_f32_le(), y: buf.get_f32_le(), z: buf.get_f32_le() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFlow {
    pub x: f32,
    pub y: f32,
}

impl WireFormat for RawFlow {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self { x: buf.get_f32_le(), y: buf.get_f32_le() })
    }
}

/// Orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
}

impl WireFormat for Attitude {
    fn encoded_len(&self) -> usize {
        6
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.roll);
        buf.put_i16_le(self.pitch);
        buf.put_i16_le(self.yaw);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 6)?;
        Ok(Self { roll: buf.get_i16_le(), pitch: buf.get_i16_le(), yaw: buf.get_i16_le() })
    }
}

/// Accelerometer, gyroscope and fused angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motion {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_roll: i16,
    pub gyro_pitch: i16,
    pub gyro_yaw: i16,
    pub angle_roll: i16,
    pub angle_pitch: i16,
    pub angle_yaw: i16,
}

impl WireFormat for Motion {
    fn encoded_len(&self) -> usize {
        18
    }

    fn encode(&self, buf: &mut BytesMut) {
        for value in [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.gyro_roll,
            self.gyro_pitch,
            self.gyro_yaw,
            self.angle_roll,
            self.angle_pitch,
            self.angle_yaw,
        ] {
            buf.put_i16_le(value);
        }
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 18)?;
        Ok(Self {
            accel_x: buf.get_i16_le(),
            accel_y: buf.get_i16_le(),
            accel_z: buf.get_i16_le(),
            gyro_roll: buf.get_i16_le(),
            gyro_pitch: buf.get_i16_le(),
            gyro_yaw: buf.get_i16_le(),
            angle_roll: buf.get_i16_le(),
            angle_pitch: buf.get_i16_le(),
            angle_yaw: buf.get_i16_le(),
        })
    }
}

/// Unfiltered accelerometer and gyroscope counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMotion {
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    pub gyro_roll: i16,
    pub gyro_pitch: i16,
    pub gyro_yaw: i16,
}

impl WireFormat for RawMotion {
    fn encoded_len(&self) -> usize {
        12
    }

    fn encode(&self, buf: &mut BytesMut) {
        for value in [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.gyro_roll,
            self.gyro_pitch,
            self.gyro_yaw,
        ] {
            buf.put_i16_le(value);
        }
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 12)?;
        Ok(Self {
            accel_x: buf.get_i16_le(),
            accel_y: buf.get_i16_le(),
            accel_z: buf.get_i16_le(),
            gyro_roll: buf.get_i16_le(),
            gyro_pitch: buf.get_i16_le(),
            gyro_yaw: buf.get_i16_le(),
        })
    }
}

/// Time-of-flight distances in millimeters. Sensors that are not fitted read 0 or -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub left: i16,
    pub front: i16,
    pub right: i16,
    pub rear: i16,
    pub top: i16,
    pub bottom: i16,
}

impl WireFormat for Range {
    fn encoded_len(&self) -> usize {
        12
    }

    fn encode(&self, buf: &mut BytesMut) {
        for value in [self.left, self.front, self.right, self.rear, self.top, self.bottom] {
            buf.put_i16_le(value);
        }
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 12)?;
        Ok(Self {
            left: buf.get_i16_le(),
            front: buf.get_i16_le(),
            right: buf.get_i16_le(),
            rear: buf.get_i16_le(),
            top: buf.get_i16_le(),
            bottom: buf.get_i16_le(),
        })
    }
}

/// Flight and system modes plus battery percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub mode_system: ModeSystem,
    pub mode_flight: ModeFlight,
    pub mode_control_flight: ModeControlFlight,
    pub mode_movement: ModeMovement,
    pub headless: Headless,
    pub control_speed: u8,
    pub sensor_orientation: SensorOrientation,
    pub battery: u8,
}

impl WireFormat for State {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.mode_system.code());
        buf.put_u8(self.mode_flight.code());
        buf.put_u8(self.mode_control_flight.code());
        buf.put_u8(self.mode_movement.code());
        buf.put_u8(self.headless.code());
        buf.put_u8(self.control_speed);
        buf.put_u8(self.sensor_orientation.code());
        buf.put_u8(self.battery);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self {
            mode_system: buf.get_u8().try_into()?,
            mode_flight: buf.get_u8().try_into()?,
            mode_control_flight: buf.get_u8().try_into()?,
            mode_movement: buf.get_u8().try_into()?,
            headless: buf.get_u8().try_into()?,
            control_speed: buf.get_u8(),
            sensor_orientation: buf.get_u8().try_into()?,
            battery: buf.get_u8(),
        })
    }
}

/// Flight trim offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trim {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
    pub throttle: i16,
}

impl WireFormat for Trim {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.roll);
        buf.put_i16_le(self.pitch);
        buf.put_i16_le(self.yaw);
        buf.put_i16_le(self.throttle);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self {
            roll: buf.get_i16_le(),
            pitch: buf.get_i16_le(),
            yaw: buf.get_i16_le(),
            throttle: buf.get_i16_le(),
        })
    }
}

/// Lifetime flight counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    /// Seconds powered on.
    pub time_system: u32,
    /// Seconds in flight.
    pub time_flight: u32,
    pub takeoff: u16,
    pub landing: u16,
    pub accident: u16,
}

impl WireFormat for Count {
    fn encoded_len(&self) -> usize {
        14
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.time_system);
        buf.put_u32_le(self.time_flight);
        buf.put_u16_le(self.takeoff);
        buf.put_u16_le(self.landing);
        buf.put_u16_le(self.accident);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 14)?;
        Ok(Self {
            time_system: buf.get_u32_le(),
            time_flight: buf.get_u32_le(),
            takeoff: buf.get_u16_le(),
            landing: buf.get_u16_le(),
            accident: buf.get_u16_le(),
        })
    }
}

/// Signal strength of the radio link in dBm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rssi {
    pub rssi: i8,
}

impl WireFormat for Rssi {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i8(self.rssi);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 1)?;
        Ok(Self { rssi: buf.get_i8() })
    }
}

/// Device-reported sensor and state problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub system_time: u64,
    pub sensor_flags: BitField,
    pub state_flags: BitField,
}

impl WireFormat for ErrorReport {
    fn encoded_len(&self) -> usize {
        16
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.system_time);
        buf.put_u32_le(self.sensor_flags.value());
        buf.put_u32_le(self.state_flags.value());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 16)?;
        Ok(Self {
            system_time: buf.get_u64_le(),
            sensor_flags: BitField::new(buf.get_u32_le()),
            state_flags: BitField::new(buf.get_u32_le()),
        })
    }
}

/// Firmware version as `major.minor.build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Model and firmware information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Information {
    pub mode_update: ModeUpdate,
    pub model_number: u32,
    pub version: Version,
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl WireFormat for Information {
    fn encoded_len(&self) -> usize {
        13
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.mode_update.code());
        buf.put_u32_le(self.model_number);
        buf.put_u16_le(self.version.build);
        buf.put_u8(self.version.minor);
        buf.put_u8(self.version.major);
        buf.put_u16_le(self.year);
        buf.put_u8(self.month);
        buf.put_u8(self.day);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 13)?;
        let mode_update = buf.get_u8().try_into()?;
        let model_number = buf.get_u32_le();
        let build = buf.get_u16_le();
        let minor = buf.get_u8();
        let major = buf.get_u8();
        Ok(Self {
            mode_update,
            model_number,
            version: Version { major, minor, build },
            year: buf.get_u16_le(),
            month: buf.get_u8(),
            day: buf.get_u8(),
        })
    }
}

/// Hardware address (serial number bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: [u8; 16],
}

impl WireFormat for Address {
    fn encoded_len(&self) -> usize {
        16
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.address);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 16)?;
        let mut address = [0u8; 16];
        buf.copy_to_slice(&mut address);
        Ok(Self { address })
    }
}

/// Acknowledgement of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub system_time: u32,
    /// Kind of the frame being acknowledged.
    pub data_type: DataType,
}

impl WireFormat for Ack {
    fn encoded_len(&self) -> usize {
        5
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.system_time);
        buf.put_u8(self.data_type.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 5)?;
        Ok(Self { system_time: buf.get_u32_le(), data_type: buf.get_u8().try_into()? })
    }
}

/// Controller button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    /// One bit per button.
    pub button: u16,
    pub event: ButtonEvent,
}

impl WireFormat for Button {
    fn encoded_len(&self) -> usize {
        3
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.button);
        buf.put_u8(self.event.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 3)?;
        Ok(Self { button: buf.get_u16_le(), event: buf.get_u8().try_into()? })
    }
}

/// One stick of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stick {
    pub x: i8,
    pub y: i8,
    pub direction: JoystickDirection,
    pub event: JoystickEvent,
}

impl Stick {
    fn put(&self, buf: &mut BytesMut) {
        buf.put_i8(self.x);
        buf.put_i8(self.y);
        buf.put_u8(self.direction.code());
        buf.put_u8(self.event.code());
    }

    fn get(buf: &mut &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: buf.get_i8(),
            y: buf.get_i8(),
            direction: buf.get_u8().try_into()?,
            event: buf.get_u8().try_into()?,
        })
    }
}

/// Both controller sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joystick {
    pub left: Stick,
    pub right: Stick,
}

impl WireFormat for Joystick {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.left.put(buf);
        self.right.put(buf);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self { left: Stick::get(&mut buf)?, right: Stick::get(&mut buf)? })
    }
}

/// Color sensor reading from the card reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardColor {
    /// Hue, saturation, value and lightness per sensor.
    pub hsvl: [[u16; 4]; 2],
    /// Classified color per sensor.
    pub color: [u8; 2],
    pub card: u8,
}

impl WireFormat for CardColor {
    fn encoded_len(&self) -> usize {
        19
    }

    fn encode(&self, buf: &mut BytesMut) {
        for sensor in &self.hsvl {
            for value in sensor {
                buf.put_u16_le(*value);
            }
        }
        buf.put_slice(&self.color);
        buf.put_u8(self.card);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 19)?;
        let mut hsvl = [[0u16; 4]; 2];
        for sensor in hsvl.iter_mut() {
            for value in sensor.iter_mut() {
                *value = buf.get_u16_le();
            }
        }
        let mut color = [0u8; 2];
        buf.copy_to_slice(&mut color);
        Ok(Self { hsvl, color, card: buf.get_u8() })
    }
}
