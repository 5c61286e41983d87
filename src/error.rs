//! Error types for the drone link.
//!
//! Two layers of errors exist:
//!
//! - [`ProtocolError`] describes a malformed or undecodable frame. The receiver
//!   recovers from these locally by discarding the frame and resynchronizing,
//!   so they never reach callers of the session API.
//! - [`DroneError`] is what the public API returns. Only failures that cannot be
//!   retried or resynchronized inside the crate surface here, most importantly a
//!   transport that has gone away.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use codrone_link::DroneError;
//!
//! let error = DroneError::transport_failed("serial port vanished");
//! if !error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::types::DataType;

/// Result type alias for drone link operations.
pub type Result<T, E = DroneError> = std::result::Result<T, E>;

/// Main error type for session operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DroneError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Link is closed")]
    Closed,

    #[error("No controller serial port found: {details}")]
    PortNotFound { details: String },

    #[error("No acknowledgement for {kind:?} after {attempts} attempts")]
    AckTimeout { kind: DataType, attempts: u32 },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A frame or payload that could not be decoded.
///
/// Receivers treat every variant as "drop the frame and resynchronize".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("{kind:?} payload must be {expected} bytes, got {actual}")]
    LengthMismatch { kind: DataType, expected: usize, actual: usize },

    #[error("Invalid {field} value {value:#04x}")]
    InvalidEnum { field: &'static str, value: u8 },

    #[error("Unknown data type {0:#04x}")]
    UnknownKind(u8),

    #[error("Unknown device type {0:#04x}")]
    UnknownDevice(u8),

    #[error("Checksum mismatch: received {received:#06x}, calculated {calculated:#06x}")]
    ChecksumMismatch { received: u16, calculated: u16 },

    #[error("Payload of {length} bytes exceeds limit of {limit}")]
    PayloadTooLarge { length: usize, limit: usize },

    #[error("Display text is not valid UTF-8")]
    InvalidText,

    #[error("No payload schema for {0:?}")]
    NoSchema(DataType),
}

impl DroneError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            DroneError::Transport { .. } => false,
            DroneError::Closed => false,
            DroneError::PortNotFound { .. } => true,
            DroneError::AckTimeout { .. } => true,
            DroneError::Timeout { .. } => true,
            DroneError::Config { .. } => false,
            DroneError::Protocol(_) => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DroneError::Transport { .. } | DroneError::Closed => vec![
                "Check the USB cable between the controller and the computer",
                "Make sure the controller is powered on",
                "Open a new session once the port is available again",
            ],
            DroneError::PortNotFound { .. } => vec![
                "Plug in the controller over USB",
                "Pass the serial port name explicitly",
                "Check permissions on the serial device",
            ],
            DroneError::AckTimeout { .. } => vec![
                "Check the drone is paired with the controller",
                "Move the drone closer to the controller",
                "Increase the acknowledgement timeout",
            ],
            DroneError::Timeout { .. } => vec![
                "Increase timeout duration",
                "Check the drone battery level",
                "Verify the drone is paired and powered on",
            ],
            DroneError::Config { .. } => vec![
                "Check configuration values are within range",
                "Fall back to the documented defaults",
            ],
            DroneError::Protocol(_) => vec![
                "Retry the operation",
                "Check for electrical noise on the link",
                "Update the drone firmware",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        DroneError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with an IO source.
    pub fn transport_failed_with_source(reason: impl Into<String>, source: std::io::Error) -> Self {
        DroneError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        DroneError::Config { details: details.into() }
    }
}

impl From<std::io::Error> for DroneError {
    fn from(err: std::io::Error) -> Self {
        DroneError::Transport { reason: err.kind().to_string(), source: Some(err) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn io_errors_convert_to_transport_with_source(reason in ".*") {
                let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, reason.clone());
                let converted: DroneError = io_err.into();
                match converted {
                    DroneError::Transport { source: Some(source), .. } => {
                        prop_assert_eq!(source.to_string(), reason);
                    }
                    other => prop_assert!(false, "Expected Transport, got {:?}", other),
                }
            }

            #[test]
            fn protocol_messages_carry_context(
                expected in 0usize..64,
                actual in 0usize..64,
                value in any::<u8>(),
            ) {
                let mismatch = ProtocolError::LengthMismatch { kind: DataType::Altitude, expected, actual };
                let msg = mismatch.to_string();
                prop_assert!(msg.contains(&expected.to_string()));
                prop_assert!(msg.contains(&actual.to_string()));

                let invalid = ProtocolError::InvalidEnum { field: "ModeFlight", value };
                prop_assert!(invalid.to_string().contains("ModeFlight"));
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<DroneError>();
        assert_send_sync_static::<ProtocolError>();

        let error = DroneError::transport_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn transport_failures_are_fatal() {
        assert!(!DroneError::transport_failed("gone").is_retryable());
        assert!(!DroneError::Closed.is_retryable());
        assert!(DroneError::Timeout { duration: Duration::from_millis(200) }.is_retryable());
        assert!(DroneError::AckTimeout { kind: DataType::Command, attempts: 3 }.is_retryable());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = [
            DroneError::transport_failed("x"),
            DroneError::Closed,
            DroneError::PortNotFound { details: "none".into() },
            DroneError::AckTimeout { kind: DataType::Buzzer, attempts: 3 },
            DroneError::Timeout { duration: Duration::from_secs(1) },
            DroneError::invalid_config("bad"),
            DroneError::Protocol(ProtocolError::UnknownKind(0xEE)),
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error:?} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn protocol_error_converts_transparently() {
        let err: DroneError = ProtocolError::ChecksumMismatch { received: 1, calculated: 2 }.into();
        assert!(err.to_string().contains("Checksum mismatch"));
    }
}
