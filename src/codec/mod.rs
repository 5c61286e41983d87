//! Binary frame and payload codec.
//!
//! A frame on the wire is:
//!
//! ```text
//! +------+------+------+--------+------+------+-----------------+-----------+
//! | 0x0A | 0x55 | kind | length | from |  to  | payload (length)| crc16 LE  |
//! +------+------+------+--------+------+------+-----------------+-----------+
//! ```
//!
//! The CRC is CRC-16/XMODEM over the header and payload. All payload fields are
//! little-endian and fixed width; [`Payload`] is the closed set of schemas this
//! crate understands.
//!
//! ```rust
//! use codrone_link::codec::{self, Payload};
//! use codrone_link::codec::telemetry::Altitude;
//! use codrone_link::types::{DataType, Header};
//!
//! let payload = Payload::Altitude(Altitude {
//!     temperature: 25.0,
//!     pressure: 101_325.0,
//!     altitude: 400.0,
//!     range_height: 500.0,
//! });
//! let bytes = codec::encode_payload(&payload);
//! assert_eq!(codec::decode_payload(DataType::Altitude, &bytes).unwrap(), payload);
//!
//! let frame = codec::encode_frame(Header::to_drone(DataType::Altitude, 0), &payload).unwrap();
//! assert_eq!(&frame[..2], &codec::START_MARKER);
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use crc::{CRC_16_XMODEM, Crc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{DataType, DeviceType, Header};

pub mod outbound;
mod parser;
pub mod telemetry;

pub use parser::{FrameParser, ParsedFrame, ParserEvent, ParserStage};

use outbound::{
    Buzzer, Command, DisplayClear, DisplayDrawCircle, DisplayDrawLine, DisplayDrawPoint,
    DisplayDrawRect, DisplayDrawString, DisplayInvert, LightEvent, LightMode, PositionControl,
    Quad8, Request,
};
use telemetry::{
    Ack, Address, Altitude, Attitude, Button, CardColor, Count, ErrorReport, Flow, Information,
    Joystick, Motion, Position, Range, RawFlow, RawMotion, Rssi, State, Trim,
};

/// Two-byte start marker preceding every frame.
pub const START_MARKER: [u8; 2] = [0x0A, 0x55];

/// Trailing checksum size in bytes.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload a header can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Fixed-layout binary representation of a payload.
pub trait WireFormat: Sized {
    /// Number of bytes `encode` writes.
    fn encoded_len(&self) -> usize;

    fn encode(&self, buf: &mut BytesMut);

    /// Decode exactly `bytes`; `kind` is used for error context.
    fn decode(kind: DataType, bytes: &[u8]) -> Result<Self, ProtocolError>;
}

/// Check a payload has exactly the schema's byte count.
pub(crate) fn fixed(kind: DataType, bytes: &[u8], expected: usize) -> Result<&[u8], ProtocolError> {
    if bytes.len() == expected {
        Ok(bytes)
    } else {
        Err(ProtocolError::LengthMismatch { kind, expected, actual: bytes.len() })
    }
}

/// CRC-16/XMODEM over `header` followed by `payload`.
pub fn checksum(header: &[u8], payload: &[u8]) -> u16 {
    let mut digest = CRC16.digest();
    digest.update(header);
    digest.update(payload);
    digest.finalize()
}

/// Every payload schema understood by the codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Ack(Ack),
    Error(ErrorReport),
    Request(Request),
    Address(Address),
    Information(Information),
    Control(Quad8),
    PositionControl(PositionControl),
    Command(Command),
    Rssi(Rssi),
    LightMode(LightMode),
    LightEvent(LightEvent),
    LightDefault(LightMode),
    RawMotion(RawMotion),
    RawFlow(RawFlow),
    State(State),
    Attitude(Attitude),
    Position(Position),
    Altitude(Altitude),
    Motion(Motion),
    Range(Range),
    Flow(Flow),
    Count(Count),
    Trim(Trim),
    Buzzer(Buzzer),
    Button(Button),
    Joystick(Joystick),
    DisplayClear(DisplayClear),
    DisplayInvert(DisplayInvert),
    DisplayDrawPoint(DisplayDrawPoint),
    DisplayDrawLine(DisplayDrawLine),
    DisplayDrawRect(DisplayDrawRect),
    DisplayDrawCircle(DisplayDrawCircle),
    DisplayDrawString(DisplayDrawString),
    CardColor(CardColor),
}

impl Payload {
    /// Header kind for this payload.
    pub fn kind(&self) -> DataType {
        match self {
            Payload::Ack(_) => DataType::Ack,
            Payload::Error(_) => DataType::Error,
            Payload::Request(_) => DataType::Request,
            Payload::Address(_) => DataType::Address,
            Payload::Information(_) => DataType::Information,
            Payload::Control(_) | Payload::PositionControl(_) => DataType::Control,
            Payload::Command(_) => DataType::Command,
            Payload::Rssi(_) => DataType::Rssi,
            Payload::LightMode(_) => DataType::LightMode,
            Payload::LightEvent(_) => DataType::LightEvent,
            Payload::LightDefault(_) => DataType::LightDefault,
            Payload::RawMotion(_) => DataType::RawMotion,
            Payload::RawFlow(_) => DataType::RawFlow,
            Payload::State(_) => DataType::State,
            Payload::Attitude(_) => DataType::Attitude,
            Payload::Position(_) => DataType::Position,
            Payload::Altitude(_) => DataType::Altitude,
            Payload::Motion(_) => DataType::Motion,
            Payload::Range(_) => DataType::Range,
            Payload::Flow(_) => DataType::Flow,
            Payload::Count(_) => DataType::Count,
            Payload::Trim(_) => DataType::Trim,
            Payload::Buzzer(_) => DataType::Buzzer,
            Payload::Button(_) => DataType::Button,
            Payload::Joystick(_) => DataType::Joystick,
            Payload::DisplayClear(_) => DataType::DisplayClear,
            Payload::DisplayInvert(_) => DataType::DisplayInvert,
            Payload::DisplayDrawPoint(_) => DataType::DisplayDrawPoint,
            Payload::DisplayDrawLine(_) => DataType::DisplayDrawLine,
            Payload::DisplayDrawRect(_) => DataType::DisplayDrawRect,
            Payload::DisplayDrawCircle(_) => DataType::DisplayDrawCircle,
            Payload::DisplayDrawString(_) => DataType::DisplayDrawString,
            Payload::CardColor(_) => DataType::CardColor,
        }
    }

    /// Encoded payload length in bytes.
    pub fn encoded_len(&self) -> usize {
        self.with_wire(|w| w.wire_len())
    }

    fn with_wire<R>(&self, f: impl FnOnce(&dyn EncodeDyn) -> R) -> R {
        match self {
            Payload::Ack(p) => f(p),
            Payload::Error(p) => f(p),
            Payload::Request(p) => f(p),
            Payload::Address(p) => f(p),
            Payload::Information(p) => f(p),
            Payload::Control(p) => f(p),
            Payload::PositionControl(p) => f(p),
            Payload::Command(p) => f(p),
            Payload::Rssi(p) => f(p),
            Payload::LightMode(p) | Payload::LightDefault(p) => f(p),
            Payload::LightEvent(p) => f(p),
            Payload::RawMotion(p) => f(p),
            Payload::RawFlow(p) => f(p),
            Payload::State(p) => f(p),
            Payload::Attitude(p) => f(p),
            Payload::Position(p) => f(p),
            Payload::Altitude(p) => f(p),
            Payload::Motion(p) => f(p),
            Payload::Range(p) => f(p),
            Payload::Flow(p) => f(p),
            Payload::Count(p) => f(p),
            Payload::Trim(p) => f(p),
            Payload::Buzzer(p) => f(p),
            Payload::Button(p) => f(p),
            Payload::Joystick(p) => f(p),
            Payload::DisplayClear(p) => f(p),
            Payload::DisplayInvert(p) => f(p),
            Payload::DisplayDrawPoint(p) => f(p),
            Payload::DisplayDrawLine(p) => f(p),
            Payload::DisplayDrawRect(p) => f(p),
            Payload::DisplayDrawCircle(p) => f(p),
            Payload::DisplayDrawString(p) => f(p),
            Payload::CardColor(p) => f(p),
        }
    }
}

/// Object-safe view of [`WireFormat`]'s encoding half.
trait EncodeDyn {
    fn wire_len(&self) -> usize;
    fn put(&self, buf: &mut BytesMut);
}

impl<T: WireFormat> EncodeDyn for T {
    fn wire_len(&self) -> usize {
        self.encoded_len()
    }

    fn put(&self, buf: &mut BytesMut) {
        self.encode(buf)
    }
}

/// Encode a payload body (no framing).
pub fn encode_payload(payload: &Payload) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.encoded_len());
    payload.with_wire(|w| w.put(&mut buf));
    buf.freeze()
}

/// Decode a payload body for `kind`.
///
/// Fails when the length does not match the schema, an enumerated field is out
/// of range, or the kind has no schema.
pub fn decode_payload(kind: DataType, bytes: &[u8]) -> Result<Payload, ProtocolError> {
    let payload = match kind {
        DataType::Ack => Payload::Ack(Ack::decode(kind, bytes)?),
        DataType::Error => Payload::Error(ErrorReport::decode(kind, bytes)?),
        DataType::Request => Payload::Request(Request::decode(kind, bytes)?),
        DataType::Address => Payload::Address(Address::decode(kind, bytes)?),
        DataType::Information => Payload::Information(Information::decode(kind, bytes)?),
        DataType::Control if bytes.len() == PositionControl::SIZE => {
            Payload::PositionControl(PositionControl::decode(kind, bytes)?)
        }
        DataType::Control => Payload::Control(Quad8::decode(kind, bytes)?),
        DataType::Command => Payload::Command(Command::decode(kind, bytes)?),
        DataType::Rssi => Payload::Rssi(Rssi::decode(kind, bytes)?),
        DataType::LightMode => Payload::LightMode(LightMode::decode(kind, bytes)?),
        DataType::LightEvent => Payload::LightEvent(LightEvent::decode(kind, bytes)?),
        DataType::LightDefault => Payload::LightDefault(LightMode::decode(kind, bytes)?),
        DataType::RawMotion => Payload::RawMotion(RawMotion::decode(kind, bytes)?),
        DataType::RawFlow => Payload::RawFlow(RawFlow::decode(kind, bytes)?),
        DataType::State => Payload::State(State::decode(kind, bytes)?),
        DataType::Attitude => Payload::Attitude(Attitude::decode(kind, bytes)?),
        DataType::Position => Payload::Position(Position::decode(kind, bytes)?),
        DataType::Altitude => Payload::Altitude(Altitude::decode(kind, bytes)?),
        DataType::Motion => Payload::Motion(Motion::decode(kind, bytes)?),
        DataType::Range => Payload::Range(Range::decode(kind, bytes)?),
        DataType::Flow => Payload::Flow(Flow::decode(kind, bytes)?),
        DataType::Count => Payload::Count(Count::decode(kind, bytes)?),
        DataType::Trim => Payload::Trim(Trim::decode(kind, bytes)?),
        DataType::Buzzer => Payload::Buzzer(Buzzer::decode(kind, bytes)?),
        DataType::Button => Payload::Button(Button::decode(kind, bytes)?),
        DataType::Joystick => Payload::Joystick(Joystick::decode(kind, bytes)?),
        DataType::DisplayClear => Payload::DisplayClear(DisplayClear::decode(kind, bytes)?),
        DataType::DisplayInvert => Payload::DisplayInvert(DisplayInvert::decode(kind, bytes)?),
        DataType::DisplayDrawPoint => {
            Payload::DisplayDrawPoint(DisplayDrawPoint::decode(kind, bytes)?)
        }
        DataType::DisplayDrawLine => Payload::DisplayDrawLine(DisplayDrawLine::decode(kind, bytes)?),
        DataType::DisplayDrawRect => Payload::DisplayDrawRect(DisplayDrawRect::decode(kind, bytes)?),
        DataType::DisplayDrawCircle => {
            Payload::DisplayDrawCircle(DisplayDrawCircle::decode(kind, bytes)?)
        }
        DataType::DisplayDrawString => {
            Payload::DisplayDrawString(DisplayDrawString::decode(kind, bytes)?)
        }
        DataType::CardColor => Payload::CardColor(CardColor::decode(kind, bytes)?),
        other => return Err(ProtocolError::NoSchema(other)),
    };
    Ok(payload)
}

/// Whether [`decode_payload`] has a schema for `kind`.
pub fn has_schema(kind: DataType) -> bool {
    !matches!(decode_payload(kind, &[]), Err(ProtocolError::NoSchema(_)))
}

/// Encode a complete frame.
///
/// `header.kind` and `header.length` are taken from the payload; only the
/// routing fields of `header` are used as given.
pub fn encode_frame(header: Header, payload: &Payload) -> Result<Bytes, ProtocolError> {
    let body = encode_payload(payload);
    if body.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge { length: body.len(), limit: MAX_PAYLOAD });
    }
    let header = Header { kind: payload.kind(), length: body.len() as u8, ..header };
    Ok(frame_bytes(header, &body))
}

/// Frame raw payload bytes without consulting a schema.
pub fn encode_raw_frame(
    kind: DataType,
    source: DeviceType,
    destination: DeviceType,
    body: &[u8],
) -> Result<Bytes, ProtocolError> {
    if body.len() > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge { length: body.len(), limit: MAX_PAYLOAD });
    }
    Ok(frame_bytes(Header::new(kind, body.len() as u8, source, destination), body))
}

fn frame_bytes(header: Header, body: &[u8]) -> Bytes {
    let header_bytes = header.to_bytes();
    let crc = checksum(&header_bytes, body);

    let mut buf =
        BytesMut::with_capacity(START_MARKER.len() + Header::SIZE + body.len() + CHECKSUM_SIZE);
    buf.put_slice(&START_MARKER);
    buf.put_slice(&header_bytes);
    buf.put_slice(body);
    buf.put_u16_le(crc);
    buf.freeze()
}
