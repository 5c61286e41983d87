//! Session configuration.
//!
//! Every field has a documented default, so an empty document is a valid
//! configuration. Durations are stored as milliseconds to keep YAML files
//! readable:
//!
//! ```rust
//! use codrone_link::LinkConfig;
//! use codrone_link::types::DataType;
//! use std::time::Duration;
//!
//! let config = LinkConfig::from_yaml(
//!     "command_interval_ms: 0\ntelemetry:\n  freshness_ms:\n    Altitude: 500\n",
//! )
//! .unwrap();
//! assert_eq!(config.command_interval(), Duration::ZERO);
//! assert_eq!(config.telemetry.freshness(DataType::Altitude), Duration::from_millis(500));
//! // A `freshness_ms` map replaces the default map, other kinds fall back to
//! // `default_freshness_ms`
//! assert_eq!(config.telemetry.freshness(DataType::Range), Duration::from_millis(100));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::types::DataType;
use crate::{DroneError, Result};

/// Link-level settings: port, framing and command pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port name. `None` auto-detects the controller by USB vendor id.
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Partial frames older than this are discarded.
    pub receive_timeout_ms: u64,
    /// Largest payload the receiver accepts.
    pub max_payload: usize,
    /// Consecutive read errors before the link is declared closed.
    pub max_read_errors: u32,
    /// Minimum spacing between outbound frames. Zero disables pacing.
    pub command_interval_ms: u64,
    pub ack_timeout_ms: u64,
    pub ack_retries: u32,
    pub telemetry: TelemetryConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: crate::transport::serial::BAUD_RATE,
            receive_timeout_ms: 600,
            max_payload: 128,
            max_read_errors: 5,
            command_interval_ms: 60,
            ack_timeout_ms: 200,
            ack_retries: 3,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Parse a YAML document, filling omitted fields with defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| DroneError::invalid_config(format!("YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(DroneError::invalid_config("baud_rate must be positive"));
        }
        if self.max_payload == 0 || self.max_payload > crate::codec::MAX_PAYLOAD {
            return Err(DroneError::invalid_config(format!(
                "max_payload must be within 1..={}",
                crate::codec::MAX_PAYLOAD
            )));
        }
        if self.max_read_errors == 0 {
            return Err(DroneError::invalid_config("max_read_errors must be at least 1"));
        }
        if self.ack_retries == 0 {
            return Err(DroneError::invalid_config("ack_retries must be at least 1"));
        }
        self.telemetry.validate()
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn command_interval(&self) -> Duration {
        Duration::from_millis(self.command_interval_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Freshness and backoff policy for telemetry reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Freshness threshold for kinds without an override.
    pub default_freshness_ms: u64,
    /// Per-kind freshness thresholds. A configured map replaces the defaults.
    pub freshness_ms: HashMap<DataType, u64>,
    /// Bounded wait for a requested frame to arrive.
    pub request_timeout_ms: u64,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Upper bound of the random jitter added to each backoff.
    pub jitter_max_ms: u64,
    /// Signal strength at or below which the link counts as weak.
    pub weak_rssi_dbm: i8,
    /// Freshness multiplier applied on a weak link.
    pub weak_link_scale: f64,
    /// Extra Altitude requests while the barometer still reports zero pressure.
    pub pressure_retries: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let freshness_ms = HashMap::from([
            (DataType::Range, 50),
            (DataType::Flow, 50),
            (DataType::Motion, 50),
            (DataType::Attitude, 50),
            (DataType::Position, 100),
            (DataType::Altitude, 200),
            (DataType::State, 250),
            (DataType::Rssi, 500),
            (DataType::Count, 1_000),
            (DataType::Information, 5_000),
            (DataType::Address, 5_000),
        ]);
        Self {
            default_freshness_ms: 100,
            freshness_ms,
            request_timeout_ms: 200,
            base_backoff_ms: 100,
            max_backoff_ms: 2_000,
            jitter_max_ms: 25,
            weak_rssi_dbm: -80,
            weak_link_scale: 2.0,
            pressure_retries: 3,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(DroneError::invalid_config("request_timeout_ms must be positive"));
        }
        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(DroneError::invalid_config("base_backoff_ms exceeds max_backoff_ms"));
        }
        if !self.weak_link_scale.is_finite() || self.weak_link_scale < 1.0 {
            return Err(DroneError::invalid_config("weak_link_scale must be a finite value >= 1"));
        }
        Ok(())
    }

    /// Freshness threshold for `kind` on a healthy link.
    pub fn freshness(&self, kind: DataType) -> Duration {
        let ms = self.freshness_ms.get(&kind).copied().unwrap_or(self.default_freshness_ms);
        Duration::from_millis(ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        LinkConfig::default().validate().unwrap();
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.receive_timeout(), Duration::from_millis(600));
        assert_eq!(config.telemetry.freshness(DataType::Button), Duration::from_millis(100));
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(LinkConfig::from_yaml("{}").unwrap(), LinkConfig::default());
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let config = LinkConfig::from_yaml(
            "port: /dev/ttyACM0\nack_retries: 5\ntelemetry:\n  max_backoff_ms: 4000\n",
        )
        .unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.ack_retries, 5);
        assert_eq!(config.telemetry.max_backoff(), Duration::from_secs(4));
        assert_eq!(config.telemetry.base_backoff(), Duration::from_millis(100));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = LinkConfig::from_yaml("max_payload: 0").unwrap_err();
        assert!(matches!(err, DroneError::Config { .. }));

        let err = LinkConfig::from_yaml("telemetry:\n  base_backoff_ms: 5000\n").unwrap_err();
        assert!(err.to_string().contains("base_backoff_ms"));

        let err = LinkConfig::from_yaml("telemetry:\n  weak_link_scale: 0.5\n").unwrap_err();
        assert!(!err.is_retryable());

        assert!(LinkConfig::from_yaml("baud_rate: [").is_err());
    }
}
