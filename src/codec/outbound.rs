//! Payloads the host sends: requests, flight set-points and actuator commands.
//!
//! Encoding is deterministic, so the same logical command always produces the
//! same bytes. Every type also decodes, which keeps golden-byte and round-trip
//! tests symmetric with the telemetry payloads.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::{WireFormat, fixed};
use crate::error::ProtocolError;
use crate::types::{BuzzerMode, CommandType, DataType, DisplayFont, DisplayLine, DisplayPixel};

/// Ask the drone to send one frame of `data_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub data_type: DataType,
}

impl WireFormat for Request {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.data_type.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 1)?;
        Ok(Self { data_type: buf.get_u8().try_into()? })
    }
}

/// Stick-style control, each axis -100..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad8 {
    pub roll: i8,
    pub pitch: i8,
    pub yaw: i8,
    pub throttle: i8,
}

impl Quad8 {
    pub const SIZE: usize = 4;
}

impl WireFormat for Quad8 {
    fn encoded_len(&self) -> usize {
        Self::SIZE
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i8(self.roll);
        buf.put_i8(self.pitch);
        buf.put_i8(self.yaw);
        buf.put_i8(self.throttle);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, Self::SIZE)?;
        Ok(Self {
            roll: buf.get_i8(),
            pitch: buf.get_i8(),
            yaw: buf.get_i8(),
            throttle: buf.get_i8(),
        })
    }
}

/// Relative position target in meters, with heading in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionControl {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Meters per second.
    pub velocity: f32,
    pub heading: i16,
    /// Degrees per second.
    pub rotational_velocity: i16,
}

impl PositionControl {
    pub const SIZE: usize = 20;
}

impl WireFormat for PositionControl {
    fn encoded_len(&self) -> usize {
        Self::SIZE
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.x);
        buf.put_f32_le(self.y);
        buf.put_f32_le(self.z);
        buf.put_f32_le(self.velocity);
        buf.put_i16_le(self.heading);
        buf.put_i16_le(self.rotational_velocity);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, Self::SIZE)?;
        Ok(Self {
            x: buf.get_f32_le(),
            y: buf.get_f32_le(),
            z: buf.get_f32_le(),
            velocity: buf.get_f32_le(),
            heading: buf.get_i16_le(),
            rotational_velocity: buf.get_i16_le(),
        })
    }
}

/// Generic command with a one-byte option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: CommandType,
    pub option: u8,
}

impl WireFormat for Command {
    fn encoded_len(&self) -> usize {
        2
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.command.code());
        buf.put_u8(self.option);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 2)?;
        Ok(Self { command: buf.get_u8().try_into()?, option: buf.get_u8() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buzzer {
    pub mode: BuzzerMode,
    /// Scale index or frequency in Hz depending on `mode`.
    pub value: u16,
    /// Milliseconds.
    pub time: u16,
}

impl WireFormat for Buzzer {
    fn encoded_len(&self) -> usize {
        5
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.mode.code());
        buf.put_u16_le(self.value);
        buf.put_u16_le(self.time);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 5)?;
        Ok(Self { mode: buf.get_u8().try_into()?, value: buf.get_u16_le(), time: buf.get_u16_le() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// LED pattern. The color is optional; without it the device keeps its current color.
///
/// Also used for `LightDefault`, which stores the pattern across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightMode {
    /// Device-specific light mode code.
    pub mode: u8,
    pub interval: u16,
    pub color: Option<Rgb>,
}

impl WireFormat for LightMode {
    fn encoded_len(&self) -> usize {
        if self.color.is_some() { 6 } else { 3 }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.mode);
        buf.put_u16_le(self.interval);
        if let Some(color) = self.color {
            buf.put_u8(color.r);
            buf.put_u8(color.g);
            buf.put_u8(color.b);
        }
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = match bytes.len() {
            3 | 6 => bytes,
            actual => return Err(ProtocolError::LengthMismatch { kind, expected: 6, actual }),
        };
        let mode = buf.get_u8();
        let interval = buf.get_u16_le();
        let color = if buf.has_remaining() {
            Some(Rgb { r: buf.get_u8(), g: buf.get_u8(), b: buf.get_u8() })
        } else {
            None
        };
        Ok(Self { mode, interval, color })
    }
}

/// Play an LED event `repeat` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightEvent {
    pub event: u8,
    pub interval: u16,
    pub repeat: u8,
}

impl WireFormat for LightEvent {
    fn encoded_len(&self) -> usize {
        4
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.event);
        buf.put_u16_le(self.interval);
        buf.put_u8(self.repeat);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 4)?;
        Ok(Self { event: buf.get_u8(), interval: buf.get_u16_le(), repeat: buf.get_u8() })
    }
}

/// Rectangle on the controller display, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRegion {
    pub x: i16,
    pub y: i16,
    pub width: i16,
    pub height: i16,
}

impl DisplayRegion {
    fn put(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.x);
        buf.put_i16_le(self.y);
        buf.put_i16_le(self.width);
        buf.put_i16_le(self.height);
    }

    fn get(buf: &mut &[u8]) -> Self {
        Self { x: buf.get_i16_le(), y: buf.get_i16_le(), width: buf.get_i16_le(), height: buf.get_i16_le() }
    }
}

/// Clear the whole display, or one region of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayClear {
    pub region: Option<DisplayRegion>,
    pub pixel: DisplayPixel,
}

impl WireFormat for DisplayClear {
    fn encoded_len(&self) -> usize {
        if self.region.is_some() { 9 } else { 1 }
    }

    fn encode(&self, buf: &mut BytesMut) {
        if let Some(region) = &self.region {
            region.put(buf);
        }
        buf.put_u8(self.pixel.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = bytes;
        let region = match bytes.len() {
            1 => None,
            9 => Some(DisplayRegion::get(&mut buf)),
            actual => return Err(ProtocolError::LengthMismatch { kind, expected: 9, actual }),
        };
        Ok(Self { region, pixel: buf.get_u8().try_into()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInvert {
    pub region: DisplayRegion,
}

impl WireFormat for DisplayInvert {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.region.put(buf);
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self { region: DisplayRegion::get(&mut buf) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDrawPoint {
    pub x: i16,
    pub y: i16,
    pub pixel: DisplayPixel,
}

impl WireFormat for DisplayDrawPoint {
    fn encoded_len(&self) -> usize {
        5
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.x);
        buf.put_i16_le(self.y);
        buf.put_u8(self.pixel.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 5)?;
        Ok(Self { x: buf.get_i16_le(), y: buf.get_i16_le(), pixel: buf.get_u8().try_into()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDrawLine {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
    pub pixel: DisplayPixel,
    pub line: DisplayLine,
}

impl WireFormat for DisplayDrawLine {
    fn encoded_len(&self) -> usize {
        10
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.x1);
        buf.put_i16_le(self.y1);
        buf.put_i16_le(self.x2);
        buf.put_i16_le(self.y2);
        buf.put_u8(self.pixel.code());
        buf.put_u8(self.line.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 10)?;
        Ok(Self {
            x1: buf.get_i16_le(),
            y1: buf.get_i16_le(),
            x2: buf.get_i16_le(),
            y2: buf.get_i16_le(),
            pixel: buf.get_u8().try_into()?,
            line: buf.get_u8().try_into()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDrawRect {
    pub region: DisplayRegion,
    pub pixel: DisplayPixel,
    pub fill: bool,
    pub line: DisplayLine,
}

impl WireFormat for DisplayDrawRect {
    fn encoded_len(&self) -> usize {
        11
    }

    fn encode(&self, buf: &mut BytesMut) {
        self.region.put(buf);
        buf.put_u8(self.pixel.code());
        buf.put_u8(self.fill.into());
        buf.put_u8(self.line.code());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 11)?;
        Ok(Self {
            region: DisplayRegion::get(&mut buf),
            pixel: buf.get_u8().try_into()?,
            fill: flag(buf.get_u8())?,
            line: buf.get_u8().try_into()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDrawCircle {
    pub x: i16,
    pub y: i16,
    pub radius: i16,
    pub pixel: DisplayPixel,
    pub fill: bool,
}

impl WireFormat for DisplayDrawCircle {
    fn encoded_len(&self) -> usize {
        8
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.x);
        buf.put_i16_le(self.y);
        buf.put_i16_le(self.radius);
        buf.put_u8(self.pixel.code());
        buf.put_u8(self.fill.into());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = fixed(kind, bytes, 8)?;
        Ok(Self {
            x: buf.get_i16_le(),
            y: buf.get_i16_le(),
            radius: buf.get_i16_le(),
            pixel: buf.get_u8().try_into()?,
            fill: flag(buf.get_u8())?,
        })
    }
}

/// Text drawn at a pixel position. The text length is implied by the frame length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDrawString {
    pub x: i16,
    pub y: i16,
    pub font: DisplayFont,
    pub pixel: DisplayPixel,
    pub text: String,
}

impl DisplayDrawString {
    const FIXED_LEN: usize = 6;
}

impl WireFormat for DisplayDrawString {
    fn encoded_len(&self) -> usize {
        Self::FIXED_LEN + self.text.len()
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16_le(self.x);
        buf.put_i16_le(self.y);
        buf.put_u8(self.font.code());
        buf.put_u8(self.pixel.code());
        buf.put_slice(self.text.as_bytes());
    }

    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < Self::FIXED_LEN {
            return Err(ProtocolError::LengthMismatch {
                kind,
                expected: Self::FIXED_LEN,
                actual: bytes.len(),
            });
        }
        let mut buf = bytes;
        let x = buf.get_i16_le();
        let y = buf.get_i16_le();
        let font = buf.get_u8().try_into()?;
        let pixel = buf.get_u8().try_into()?;
        let text = std::str::from_utf8(buf).map_err(|_| ProtocolError::InvalidText)?.to_owned();
        Ok(Self { x, y, font, pixel, text })
    }
}

fn flag(value: u8) -> Result<bool, ProtocolError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProtocolError::InvalidEnum { field: "fill", value: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: WireFormat>(value: &T) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        assert_eq!(buf.len(), value.encoded_len());
        buf.to_vec()
    }

    #[test]
    fn draw_line_layout() {
        let line = DisplayDrawLine {
            x1: 1,
            y1: -1,
            x2: 0x0102,
            y2: 64,
            pixel: DisplayPixel::White,
            line: DisplayLine::Dotted,
        };
        let bytes = encoded(&line);
        assert_eq!(
            &bytes[..8],
            &[0x01, 0x00, 0xFF, 0xFF, 0x02, 0x01, 0x40, 0x00]
        );
        assert_eq!(bytes[8], DisplayPixel::White.code());
        assert_eq!(bytes[9], DisplayLine::Dotted.code());
        assert_eq!(DisplayDrawLine::decode(DataType::DisplayDrawLine, &bytes).unwrap(), line);
    }

    #[test]
    fn light_mode_color_is_optional() {
        let plain = LightMode { mode: 0x22, interval: 500, color: None };
        assert_eq!(encoded(&plain), [0x22, 0xF4, 0x01]);

        let colored = LightMode { color: Some(Rgb { r: 255, g: 16, b: 0 }), ..plain };
        assert_eq!(encoded(&colored), [0x22, 0xF4, 0x01, 255, 16, 0]);
        assert_eq!(LightMode::decode(DataType::LightMode, &encoded(&colored)).unwrap(), colored);
        assert!(LightMode::decode(DataType::LightMode, &[0x22, 0xF4, 0x01, 255]).is_err());
    }

    #[test]
    fn command_and_event_layouts() {
        let command = Command { command: CommandType::ClearCounter, option: 0 };
        assert_eq!(encoded(&command), [0xA0, 0x00]);

        let event = LightEvent { event: 0x11, interval: 0x0100, repeat: 3 };
        assert_eq!(encoded(&event), [0x11, 0x00, 0x01, 3]);

        let circle = DisplayDrawCircle { x: 2, y: 3, radius: 10, pixel: DisplayPixel::Black, fill: true };
        let bytes = encoded(&circle);
        assert_eq!(&bytes[..6], &[2, 0, 3, 0, 10, 0]);
        assert_eq!(bytes[7], 1);
    }

    #[test]
    fn request_names_its_kind() {
        let request = Request { data_type: DataType::Information };
        assert_eq!(encoded(&request), [DataType::Information.code()]);
        assert!(Request::decode(DataType::Request, &[]).is_err());
    }
}
