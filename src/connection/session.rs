//! One connected drone: store, receiver, command channel and cache.

use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{Clock, Jitter, RandomJitter, Reading, TelemetryCache, TokioClock};
use crate::codec::Payload;
use crate::command::CommandChannel;
use crate::config::LinkConfig;
use crate::receiver::{FrameReceiver, LinkState, ReceiverCounters, ReceiverStats};
use crate::state::{StateEntry, StateStore, Telemetry};
use crate::stream::entry_updates;
use crate::transport::{FrameSink, FrameSource};
use crate::types::{DataType, DeviceType, UpdateRate};
use crate::{DroneError, Result};

/// A live link to one drone.
///
/// Dropping the session stops the receiver task; all state goes with it.
pub struct Session {
    store: Arc<StateStore>,
    commands: Arc<CommandChannel>,
    cache: TelemetryCache,

    /// Link state watch receiver
    link: watch::Receiver<LinkState>,

    stats: Arc<ReceiverStats>,

    /// Cancellation token for stopping the receiver
    cancel: CancellationToken,

    config: LinkConfig,
}

impl Session {
    /// Start a session over a bidirectional byte stream.
    pub async fn open<T>(transport: T, config: LinkConfig) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (source, sink) = crate::transport::split(transport);
        Self::from_parts(source, sink, config).await
    }

    /// Start a session over separately owned read and write halves.
    pub async fn from_parts<S, K>(source: S, sink: K, config: LinkConfig) -> Result<Self>
    where
        S: FrameSource,
        K: FrameSink,
    {
        Self::with_clock(source, sink, config, Arc::new(TokioClock), Arc::new(RandomJitter)).await
    }

    /// [`from_parts`](Self::from_parts) with an injected clock and jitter.
    pub async fn with_clock<S, K>(
        source: S,
        sink: K,
        config: LinkConfig,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn Jitter>,
    ) -> Result<Self>
    where
        S: FrameSource,
        K: FrameSink,
    {
        config.validate()?;

        let store = Arc::new(StateStore::new());
        let receiver = FrameReceiver::spawn(source, Arc::clone(&store), &config);
        let commands = Arc::new(CommandChannel::new(
            Box::new(sink),
            Arc::clone(&store),
            receiver.link.clone(),
            &config,
        ));
        let cache = TelemetryCache::with_clock(
            Arc::clone(&store),
            Arc::clone(&commands),
            config.telemetry.clone(),
            clock,
            jitter,
        );

        info!("Session opened (max payload {} bytes)", config.max_payload);

        Ok(Self {
            store,
            commands,
            cache,
            link: receiver.link,
            stats: receiver.stats,
            cancel: receiver.cancel,
            config,
        })
    }

    /// Latest value of `kind`, refreshed if older than its freshness threshold.
    pub async fn fetch(&self, kind: DataType) -> Reading {
        self.cache.fetch(kind, None).await
    }

    /// [`fetch`](Self::fetch) with a caller-chosen maximum age.
    pub async fn fetch_within(&self, kind: DataType, max_age: Duration) -> Reading {
        self.cache.fetch(kind, Some(max_age)).await
    }

    /// Typed fetch, e.g. `session.fetch_as::<Altitude>()`.
    pub async fn fetch_as<T: Telemetry>(&self) -> Option<T> {
        self.cache.fetch_as::<T>().await
    }

    /// Altitude with the barometer warm-up retry.
    pub async fn fetch_altitude(&self) -> Reading {
        self.cache.fetch_altitude_settled().await
    }

    /// Ask for `kind` without waiting for it.
    pub async fn request(&self, kind: DataType) -> Result<()> {
        self.commands.request(kind).await
    }

    pub async fn send(&self, payload: &Payload) -> Result<()> {
        self.commands.send(payload).await
    }

    pub async fn send_to(&self, payload: &Payload, target: DeviceType) -> Result<()> {
        self.commands.send_to(payload, target).await
    }

    /// Send, then wait for the next receipt of `await_kind`.
    pub async fn send_and_await(
        &self,
        payload: &Payload,
        await_kind: DataType,
        timeout: Duration,
    ) -> Result<bool> {
        self.commands.send_and_await(payload, await_kind, timeout).await
    }

    /// Send and wait for the drone's acknowledgement, retrying.
    pub async fn send_confirmed(&self, payload: &Payload) -> Result<()> {
        self.commands.send_confirmed(payload).await
    }

    /// Current snapshot without any I/O.
    pub fn state(&self, kind: DataType) -> Arc<StateEntry> {
        self.store.get(kind)
    }

    pub fn age(&self, kind: DataType) -> Option<Duration> {
        self.cache.age(kind)
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn cache(&self) -> &TelemetryCache {
        &self.cache
    }

    /// Stream of receipts of `kind`.
    pub fn subscribe(
        &self,
        kind: DataType,
        rate: UpdateRate,
    ) -> Result<impl Stream<Item = Arc<StateEntry>> + 'static> {
        let slot = self.store.subscribe(kind).ok_or_else(|| {
            DroneError::invalid_config(format!("{kind:?} is not a stored kind"))
        })?;
        Ok(entry_updates(slot, rate))
    }

    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    /// Link state changes as a stream.
    pub fn link_updates(&self) -> impl Stream<Item = LinkState> + 'static {
        WatchStream::new(self.link.clone())
    }

    pub fn stats(&self) -> ReceiverCounters {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Stop the receiver and wait (bounded) for the link to report closed.
    pub async fn close(mut self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(
            Duration::from_secs(1),
            self.link.wait_for(|state| *state == LinkState::Closed),
        )
        .await;
        info!("Session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("Dropping session");
        self.cancel.cancel();
    }
}
