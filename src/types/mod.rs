//! Core protocol vocabulary.
//!
//! This module provides the identifiers and small value types shared by the
//! codec, the receiver and the session API.
//!
//! ## Architecture
//!
//! - [`DataType`] selects a payload schema and routes decoded frames
//! - [`DeviceType`] names the logical source and destination of a frame
//! - [`Header`] is the four-byte frame header
//! - [`BitField`] wraps the sensor and state error words with flag helpers
//! - The mode and event enums reject codes outside their documented set
//!
//! ## Usage Example
//!
//! ```rust
//! use codrone_link::types::{DataType, DeviceType, Header, ModeFlight};
//!
//! let header = Header::from_bytes([0x43, 16, 0x10, 0x70]).unwrap();
//! assert_eq!(header.kind, DataType::Altitude);
//! assert_eq!(header.source, DeviceType::Drone);
//!
//! assert!(ModeFlight::try_from(0x13).unwrap().is_airborne());
//! assert!(ModeFlight::try_from(0x99).is_err());
//! ```

#[macro_use]
mod wire_enum;

mod bitfield;
mod data_type;
pub mod error_flags;
mod header;
mod modes;
mod update_rate;

// Re-export all public types
pub use bitfield::{BitField, low_battery, motion_calibrating, sensor_unresponsive};
pub use data_type::{DataType, DeviceType};
pub use header::Header;
pub use modes::{
    BuzzerMode, ButtonEvent, CommandType, DisplayFont, DisplayLine, DisplayPixel, Headless,
    JoystickDirection, JoystickEvent, ModeControlFlight, ModeFlight, ModeMovement, ModeSystem,
    ModeUpdate, SensorOrientation,
};
pub use update_rate::UpdateRate;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProtocolError;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_data_type_codes_round_trip(code in any::<u8>()) {
            // Every byte either maps to a kind whose code is that byte, or is rejected
            match DataType::try_from(code) {
                Ok(kind) => prop_assert_eq!(kind.code(), code),
                Err(err) => prop_assert_eq!(err, ProtocolError::UnknownKind(code)),
            }
        }

        #[test]
        fn prop_header_parses_only_known_identifiers(bytes in any::<[u8; 4]>()) {
            let known = DataType::try_from(bytes[0]).is_ok()
                && DeviceType::try_from(bytes[2]).is_ok()
                && DeviceType::try_from(bytes[3]).is_ok();
            match Header::from_bytes(bytes) {
                Ok(header) => {
                    prop_assert!(known);
                    prop_assert_eq!(header.to_bytes(), bytes);
                }
                Err(_) => prop_assert!(!known),
            }
        }

        #[test]
        fn prop_bitfield_flag_operations(
            value in any::<u32>(),
            bit_index in 0..32u32
        ) {
            let bitfield = BitField::new(value);
            let expected_bit_set = (value & (1 << bit_index)) != 0;
            prop_assert_eq!(bitfield.is_set(bit_index), expected_bit_set);
            prop_assert_eq!(bitfield.has_flag(1 << bit_index), expected_bit_set);
        }
    }

    #[test]
    fn all_lists_every_variant_once() {
        let mut codes: Vec<u8> = DataType::ALL.iter().map(|k| k.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), DataType::ALL.len());
        assert!(DataType::ALL.contains(&DataType::Altitude));
        assert_eq!(DeviceType::ALL.len(), 18);
    }

    #[test]
    fn invalid_mode_names_its_field() {
        let err = ModeFlight::try_from(0x17).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidEnum { field: "ModeFlight", value: 0x17 });
        assert_eq!(DeviceType::try_from(0x11).unwrap_err(), ProtocolError::UnknownDevice(0x11));
    }

    #[test]
    fn error_variants_decode_like_any_other() {
        assert_eq!(DataType::try_from(DataType::Error.code()).unwrap(), DataType::Error);
        assert_eq!(ModeSystem::try_from(ModeSystem::Error.code()).unwrap(), ModeSystem::Error);
        assert_eq!(ModeFlight::try_from(ModeFlight::Error.code()).unwrap(), ModeFlight::Error);
        assert_eq!(u8::from(DataType::Error), DataType::Error.code());
    }

    #[test]
    fn joystick_directions_combine_bands() {
        let combined = JoystickDirection::VerticalTop.code() | JoystickDirection::HorizontalRight.code();
        assert_eq!(JoystickDirection::try_from(combined).unwrap(), JoystickDirection::TopRight);
    }

    #[test]
    fn error_flag_helpers() {
        use error_flags::{sensor, state};
        assert!(low_battery(BitField::new(state::LOW_BATTERY | state::ATTITUDE_NOT_STABLE)));
        assert!(!low_battery(BitField::new(state::NOT_REGISTERED)));
        assert!(motion_calibrating(BitField::new(sensor::MOTION_CALIBRATING)));
        assert!(sensor_unresponsive(BitField::new(sensor::FLOW_NO_ANSWER)));
        assert!(!sensor_unresponsive(BitField::new(sensor::FLOW_WRONG_VALUE)));
        assert!(BitField::default().is_clear());
    }

    #[test]
    fn update_rate_intervals() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).normalize(), UpdateRate::Native);
        assert!(!UpdateRate::Max(0).needs_throttle());
        assert_eq!(
            UpdateRate::Max(10).throttle_interval(),
            Some(std::time::Duration::from_millis(100))
        );
    }

    #[test]
    fn button_event_names() {
        assert_eq!(ButtonEvent::Press.name(), "Press");
        assert_eq!(ButtonEvent::try_from(0x04).unwrap(), ButtonEvent::EndContinuePress);
    }
}
