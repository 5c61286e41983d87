//! Async, type-safe host client for the CoDrone EDU flying robot.
//!
//! The drone talks to the host over a USB serial link through its controller.
//! This crate frames and checksums that byte stream, keeps a live picture of
//! every telemetry kind the drone reports, and decides per read whether the
//! cached value is fresh enough or a new one has to be requested.
//!
//! # Features
//!
//! - **Resilient framing**: noise, corrupt frames and stalled transfers are
//!   dropped and the receiver resynchronizes on its own
//! - **Non-blocking state**: reading the latest value never waits on I/O
//! - **Bounded reads**: `fetch` waits at most the request timeout and labels
//!   stale values instead of failing
//! - **Backoff**: an unresponsive drone is asked less and less often
//! - **Atomic commands**: concurrent senders never interleave frames
//!
//! # Architecture
//!
//! ```text
//!  serial port ──► FrameReceiver ──► StateStore ◄── TelemetryCache ◄── caller
//!       ▲              (task)          (slots)            │
//!       └──────────── CommandChannel ◄────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use codrone_link::{Drone, UpdateRate};
//! use codrone_link::codec::telemetry::Altitude;
//! use codrone_link::types::DataType;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> codrone_link::Result<()> {
//!     let session = Drone::autodetect().await?;
//!
//!     if let Some(altitude) = session.fetch_as::<Altitude>().await {
//!         println!("{:.1} m above sea level", altitude.altitude);
//!     }
//!
//!     let mut buttons = Box::pin(session.subscribe(DataType::Button, UpdateRate::Native)?);
//!     while let Some(entry) = buttons.next().await {
//!         println!("{:?}", entry.value);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod config;
mod error;
pub mod state;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Link runtime
pub mod cache;
pub mod command;
pub mod connection;
pub mod receiver;
pub mod stream;
pub mod transport;

pub use error::*;

pub use cache::{Freshness, Reading, TelemetryCache};
pub use command::CommandChannel;
pub use config::{LinkConfig, TelemetryConfig};
pub use connection::Session;
pub use receiver::{FrameReceiver, LinkState, ReceiverCounters};
pub use state::{StateEntry, StateStore, Telemetry};
pub use types::UpdateRate;

/// Entry point for opening drone sessions.
///
/// # Examples
///
/// ## Named serial port
/// ```rust,no_run
/// use codrone_link::Drone;
///
/// #[tokio::main]
/// async fn main() -> codrone_link::Result<()> {
///     let session = Drone::connect("/dev/ttyACM0").await?;
///     // Use session...
///     Ok(())
/// }
/// ```
///
/// ## Any byte stream
/// ```rust
/// use codrone_link::{Drone, LinkConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> codrone_link::Result<()> {
/// let (_device, host) = tokio::io::duplex(1024);
/// let session = Drone::open(host, LinkConfig::default()).await?;
/// assert_eq!(session.link_state(), codrone_link::LinkState::Connected);
/// # Ok(())
/// # }
/// ```
pub struct Drone;

impl Drone {
    /// Open the named serial port with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The port does not exist or is in use
    /// - The port cannot be configured for 115200 8N1
    pub async fn connect(port: &str) -> Result<Session> {
        Self::connect_with(LinkConfig { port: Some(port.to_string()), ..LinkConfig::default() })
            .await
    }

    /// Open the first attached controller, found by USB vendor id.
    ///
    /// # Errors
    ///
    /// Returns [`DroneError::PortNotFound`] when no controller is plugged in.
    pub async fn autodetect() -> Result<Session> {
        Self::connect_with(LinkConfig::default()).await
    }

    /// Open a serial session described by `config`.
    ///
    /// With `config.port` unset the controller is auto-detected.
    pub async fn connect_with(config: LinkConfig) -> Result<Session> {
        config.validate()?;
        let port = match &config.port {
            Some(port) => port.clone(),
            None => transport::serial::find_controller_port()?,
        };
        let stream = transport::serial::open(&port, config.baud_rate)?;
        Session::open(stream, config).await
    }

    /// Run a session over an arbitrary byte stream (TCP bridge, test pipe ...).
    pub async fn open<T>(transport: T, config: LinkConfig) -> Result<Session>
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    {
        Session::open(transport, config).await
    }
}
