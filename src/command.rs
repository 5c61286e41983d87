//! Outbound command path.
//!
//! Every frame goes through one write lock, so concurrent callers can never
//! interleave bytes on the transport. The same lock enforces the minimum
//! spacing between frames that the drone's link can absorb.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

use crate::codec::outbound::Request;
use crate::codec::{self, Payload};
use crate::config::LinkConfig;
use crate::receiver::LinkState;
use crate::state::StateStore;
use crate::transport::FrameSink;
use crate::types::{DataType, DeviceType, Header};
use crate::{DroneError, Result};

struct Writer {
    sink: Box<dyn FrameSink>,
    last_sent: Option<Instant>,
}

/// Serializes and writes outbound frames.
pub struct CommandChannel {
    writer: Mutex<Writer>,
    store: Arc<StateStore>,
    link: watch::Receiver<LinkState>,
    interval: Duration,
    ack_timeout: Duration,
    ack_retries: u32,
}

impl CommandChannel {
    pub fn new(
        sink: Box<dyn FrameSink>,
        store: Arc<StateStore>,
        link: watch::Receiver<LinkState>,
        config: &LinkConfig,
    ) -> Self {
        Self {
            writer: Mutex::new(Writer { sink, last_sent: None }),
            store,
            link,
            interval: config.command_interval(),
            ack_timeout: config.ack_timeout(),
            ack_retries: config.ack_retries,
        }
    }

    /// Fire-and-forget send to the drone.
    pub async fn send(&self, payload: &Payload) -> Result<()> {
        self.send_to(payload, DeviceType::Drone).await
    }

    /// Send to an explicit target device (e.g. the controller's display).
    pub async fn send_to(&self, payload: &Payload, target: DeviceType) -> Result<()> {
        let header = Header::new(payload.kind(), 0, DeviceType::Base, target);
        let frame = codec::encode_frame(header, payload)?;
        self.write(payload.kind(), &frame).await
    }

    /// Ask the drone to transmit one frame of `kind`.
    pub async fn request(&self, kind: DataType) -> Result<()> {
        debug!("Requesting {:?}", kind);
        self.send(&Payload::Request(Request { data_type: kind })).await
    }

    /// Send `payload`, then wait up to `timeout` for a new `await_kind` receipt.
    ///
    /// Returns `false` when nothing arrived in time. Receipts that landed
    /// before the send do not count.
    pub async fn send_and_await(
        &self,
        payload: &Payload,
        await_kind: DataType,
        timeout: Duration,
    ) -> Result<bool> {
        let before = self.store.get(await_kind).sequence;
        self.send(payload).await?;
        Ok(self.store.wait_for(await_kind, before, timeout).await.is_some())
    }

    /// Send and wait for the drone to acknowledge this kind, retrying on silence.
    pub async fn send_confirmed(&self, payload: &Payload) -> Result<()> {
        let kind = payload.kind();
        for attempt in 1..=self.ack_retries {
            let before = self.store.get(DataType::Ack).sequence;
            self.send(payload).await?;
            if self.wait_for_ack(kind, before).await {
                debug!("{:?} acknowledged on attempt {}", kind, attempt);
                return Ok(());
            }
            warn!("No ack for {:?} (attempt {}/{})", kind, attempt, self.ack_retries);
        }
        Err(DroneError::AckTimeout { kind, attempts: self.ack_retries })
    }

    async fn wait_for_ack(&self, kind: DataType, mut after: u64) -> bool {
        let deadline = Instant::now() + self.ack_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(entry) = self.store.wait_for(DataType::Ack, after, remaining).await else {
                return false;
            };
            if let Some(Payload::Ack(ack)) = &entry.value
                && ack.data_type == kind
            {
                return true;
            }
            // Ack for some other frame
            after = entry.sequence;
        }
    }

    /// Whether the link is still open for writes.
    pub fn is_connected(&self) -> bool {
        *self.link.borrow() == LinkState::Connected
    }

    async fn write(&self, kind: DataType, frame: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(DroneError::Closed);
        }

        let mut writer = self.writer.lock().await;
        if let Some(last) = writer.last_sent {
            let ready_at = last + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }

        if let Err(e) = writer.sink.write_frame(frame).await {
            error!("Failed to write {:?} frame: {}", kind, e);
            return Err(DroneError::transport_failed_with_source(
                format!("writing {kind:?} frame"),
                e,
            ));
        }
        writer.last_sent = Some(Instant::now());
        trace!("Wrote {:?} frame ({} bytes)", kind, frame.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::outbound::{Buzzer, DisplayDrawString};
    use crate::codec::telemetry::{Ack, Altitude};
    use crate::test_utils::CapturedSink;
    use crate::types::{BuzzerMode, DisplayFont, DisplayPixel};

    fn channel(sink: CapturedSink, config: &LinkConfig) -> (CommandChannel, Arc<StateStore>) {
        let store = Arc::new(StateStore::new());
        let (_tx, link) = watch::channel(LinkState::Connected);
        (CommandChannel::new(Box::new(sink), Arc::clone(&store), link, config), store)
    }

    fn unpaced() -> LinkConfig {
        LinkConfig { command_interval_ms: 0, ..LinkConfig::default() }
    }

    #[tokio::test]
    async fn request_writes_one_request_frame() {
        let sink = CapturedSink::default();
        let (channel, _) = channel(sink.clone(), &unpaced());
        channel.request(DataType::Altitude).await.unwrap();

        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].header.kind, DataType::Request);
        assert_eq!(frames[0].header.source, DeviceType::Base);
        assert_eq!(frames[0].header.destination, DeviceType::Drone);
        assert_eq!(frames[0].payload.as_ref(), &[DataType::Altitude.code()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sends_never_interleave() {
        // One byte per poll, so every frame is written across many yields
        let sink = CapturedSink::trickling();
        let (channel, _) = channel(sink.clone(), &unpaced());
        let channel = Arc::new(channel);

        let buzz = Payload::Buzzer(Buzzer { mode: BuzzerMode::Hz, value: 440, time: 100 });
        let text = Payload::DisplayDrawString(DisplayDrawString {
            x: 0,
            y: 0,
            font: DisplayFont::LiberationMono5x8,
            pixel: DisplayPixel::White,
            text: "hello drone".into(),
        });

        let tasks: Vec<_> = [buzz.clone(), text.clone()]
            .into_iter()
            .map(|payload| {
                let channel = Arc::clone(&channel);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        channel.send_to(&payload, DeviceType::Controller).await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let frames = sink.frames();
        assert_eq!(frames.len(), 100);
        assert_eq!(sink.dropped(), 0);
        let buzzes = frames.iter().filter(|f| f.header.kind == DataType::Buzzer).count();
        assert_eq!(buzzes, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_frames_are_paced() {
        let sink = CapturedSink::default();
        let (channel, _) = channel(sink.clone(), &LinkConfig::default());

        let started = Instant::now();
        for _ in 0..3 {
            channel.request(DataType::Rssi).await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(120));
        assert_eq!(sink.frames().len(), 3);
    }

    #[tokio::test]
    async fn closed_link_rejects_sends() {
        let store = Arc::new(StateStore::new());
        let (_tx, link) = watch::channel(LinkState::Closed);
        let channel =
            CommandChannel::new(Box::new(CapturedSink::default()), store, link, &unpaced());
        let err = channel.request(DataType::State).await.unwrap_err();
        assert!(matches!(err, DroneError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn send_and_await_reports_arrival() {
        let sink = CapturedSink::default();
        let (channel, store) = channel(sink, &unpaced());
        let request = Payload::Request(Request { data_type: DataType::Altitude });

        assert!(!channel.send_and_await(&request, DataType::Altitude, Duration::from_millis(50)).await.unwrap());

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let altitude = Altitude { temperature: 20.0, pressure: 1.0, altitude: 2.0, range_height: 0.3 };
            writer.set(DataType::Altitude, Payload::Altitude(altitude), Instant::now());
        });
        assert!(channel.send_and_await(&request, DataType::Altitude, Duration::from_millis(50)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn send_confirmed_retries_then_fails() {
        let sink = CapturedSink::default();
        let (channel, _) = channel(sink.clone(), &unpaced());
        let buzz = Payload::Buzzer(Buzzer { mode: BuzzerMode::Stop, value: 0, time: 0 });

        let err = channel.send_confirmed(&buzz).await.unwrap_err();
        assert!(matches!(err, DroneError::AckTimeout { kind: DataType::Buzzer, attempts: 3 }));
        assert_eq!(sink.frames().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn send_confirmed_ignores_unrelated_acks() {
        let sink = CapturedSink::default();
        let (channel, store) = channel(sink.clone(), &unpaced());
        let buzz = Payload::Buzzer(Buzzer { mode: BuzzerMode::Stop, value: 0, time: 0 });

        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let other = Ack { system_time: 1, data_type: DataType::Command };
            writer.set(DataType::Ack, Payload::Ack(other), Instant::now());
            tokio::time::sleep(Duration::from_millis(5)).await;
            let ours = Ack { system_time: 2, data_type: DataType::Buzzer };
            writer.set(DataType::Ack, Payload::Ack(ours), Instant::now());
        });

        channel.send_confirmed(&buzz).await.unwrap();
        assert_eq!(sink.frames().len(), 1);
    }
}
