//! Frame header.

use serde::{Deserialize, Serialize};

use super::{DataType, DeviceType};
use crate::error::ProtocolError;

/// Four-byte header that follows the start marker of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub kind: DataType,
    /// Payload byte count.
    pub length: u8,
    pub source: DeviceType,
    pub destination: DeviceType,
}

impl Header {
    /// Encoded header size in bytes.
    pub const SIZE: usize = 4;

    pub fn new(kind: DataType, length: u8, source: DeviceType, destination: DeviceType) -> Self {
        Self { kind, length, source, destination }
    }

    /// Header for a host-originated frame addressed to the drone.
    pub fn to_drone(kind: DataType, length: u8) -> Self {
        Self::new(kind, length, DeviceType::Base, DeviceType::Drone)
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.kind.code(), self.length, self.source.code(), self.destination.code()]
    }

    /// Parse a header, rejecting unknown kinds and devices.
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: DataType::try_from(bytes[0])?,
            length: bytes[1],
            source: DeviceType::try_from(bytes[2])?,
            destination: DeviceType::try_from(bytes[3])?,
        })
    }
}
