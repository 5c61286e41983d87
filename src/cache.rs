//! Freshness-aware telemetry reads.
//!
//! [`TelemetryCache::fetch`] is what sensor-reading callers use in tight
//! loops. It answers from the [`StateStore`] while the value is fresh, asks
//! the drone for a new frame when it is not, and backs off exponentially when
//! the drone stops answering. It never fails and never waits longer than the
//! configured request timeout: a stale value comes back labelled as stale.
//!
//! Per kind, the cache keeps a small [`RequestState`]:
//!
//! ```text
//! fresh?  ──yes──► return Fresh
//!   │no
//! link closed? ──yes──► return LinkClosed
//!   │no
//! refresh in flight? ──yes──► wait on it (bounded) ──► return
//!   │no
//! inside backoff window? ──yes──► return Stale
//!   │no
//! send Request, wait (bounded) for the slot to advance
//!   ├─ arrived ──► failures = 0, backoff = 0  ──► return Fresh
//!   ├─ timeout ──► failures += 1, backoff grows ──► return Stale/Absent
//!   └─ not sent ──► return LinkClosed
//! ```
//!
//! The backoff window opens when the timeout is recorded, so the time spent
//! waiting for the reply does not count against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::codec::Payload;
use crate::command::CommandChannel;
use crate::config::TelemetryConfig;
use crate::state::{StateEntry, StateStore, Telemetry};
use crate::types::DataType;

/// Source of "now" for freshness and backoff decisions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Clock backed by tokio's time, which pauses in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Random offset added to each backoff so retries from many kinds spread out.
pub trait Jitter: Send + Sync + 'static {
    /// A value in `0..=max`.
    fn jitter(&self, max: Duration) -> Duration;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        use rand::Rng;
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn jitter(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

/// How a [`Reading`] relates to its freshness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Older than the threshold; refresh failed or was suppressed by backoff.
    Stale,
    /// Never received.
    Absent,
    /// Older than the threshold and the request could not be written because
    /// the link is closed or failing. The payload is the last known value.
    LinkClosed,
}

/// Result of a [`TelemetryCache::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub payload: Option<Payload>,
    /// Time since receipt at the moment of the read.
    pub age: Option<Duration>,
    pub freshness: Freshness,
}

impl Reading {
    fn link_closed(mut self) -> Self {
        if self.freshness != Freshness::Fresh {
            self.freshness = Freshness::LinkClosed;
        }
        self
    }

    fn from_entry(entry: &StateEntry, now: Instant, threshold: Duration) -> Self {
        let age = entry.age(now);
        let freshness = match age {
            None => Freshness::Absent,
            Some(age) if age <= threshold => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        };
        Self { payload: entry.value.clone(), age, freshness }
    }

    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }

    /// Typed view of the payload.
    pub fn value_as<T: Telemetry>(&self) -> Option<T> {
        self.payload.as_ref().and_then(T::from_payload)
    }
}

/// Per-kind request bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    pub last_request_at: Option<Instant>,
    /// End of the current backoff window, set when a timeout is recorded.
    pub next_allowed_at: Option<Instant>,
    pub consecutive_failures: u32,
    /// Minimum spacing before the next request. Zero after a success.
    pub current_backoff: Duration,
    pub in_flight: bool,
}

enum Plan {
    Request { after: u64 },
    Join { after: u64 },
    Suppressed,
}

/// Decides between cached values and fresh requests.
pub struct TelemetryCache {
    store: Arc<StateStore>,
    commands: Arc<CommandChannel>,
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn Jitter>,
    requests: Mutex<HashMap<DataType, RequestState>>,
}

impl TelemetryCache {
    pub fn new(
        store: Arc<StateStore>,
        commands: Arc<CommandChannel>,
        config: TelemetryConfig,
    ) -> Self {
        Self::with_clock(store, commands, config, Arc::new(TokioClock), Arc::new(RandomJitter))
    }

    /// Build with an injected clock and jitter source.
    pub fn with_clock(
        store: Arc<StateStore>,
        commands: Arc<CommandChannel>,
        config: TelemetryConfig,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn Jitter>,
    ) -> Self {
        Self { store, commands, config, clock, jitter, requests: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Threshold in force for `kind`, widened while the radio link is weak.
    ///
    /// An explicit `max_age` is used as given.
    pub fn effective_threshold(&self, kind: DataType, max_age: Option<Duration>) -> Duration {
        if let Some(max_age) = max_age {
            return max_age;
        }
        let threshold = self.config.freshness(kind);
        match &self.store.get(DataType::Rssi).value {
            Some(Payload::Rssi(rssi)) if rssi.rssi != 0 && rssi.rssi <= self.config.weak_rssi_dbm => {
                threshold.mul_f64(self.config.weak_link_scale)
            }
            _ => threshold,
        }
    }

    /// Latest value of `kind`, refreshed from the drone when stale.
    pub async fn fetch(&self, kind: DataType, max_age: Option<Duration>) -> Reading {
        self.read(kind, max_age, false).await
    }

    async fn read(&self, kind: DataType, max_age: Option<Duration>, force: bool) -> Reading {
        let threshold = self.effective_threshold(kind, max_age);
        let entry = self.store.get(kind);
        let now = self.clock.now();
        let reading = Reading::from_entry(&entry, now, threshold);
        if (reading.is_fresh() && !force) || !kind.is_requestable() {
            trace!("{:?} served from store ({:?})", kind, reading.freshness);
            return reading;
        }
        if !self.commands.is_connected() {
            trace!("{:?} not requested, link closed", kind);
            return reading.link_closed();
        }

        match self.plan(kind, entry.sequence, now) {
            Plan::Suppressed => {
                trace!("{:?} request suppressed by backoff", kind);
                reading
            }
            Plan::Join { after } => {
                trace!("{:?} joining refresh in flight", kind);
                self.store.wait_for(kind, after, self.config.request_timeout()).await;
                Reading::from_entry(&self.store.get(kind), self.clock.now(), threshold)
            }
            Plan::Request { after } => {
                let guard = InFlight { cache: self, kind, settled: false };
                if let Err(e) = self.commands.request(kind).await {
                    // Dropping the guard releases the slot without a backoff penalty
                    warn!("Request for {:?} not sent: {}", kind, e);
                    drop(guard);
                    return Reading::from_entry(&self.store.get(kind), self.clock.now(), threshold)
                        .link_closed();
                }
                let arrived = self.store.wait_for(kind, after, self.config.request_timeout()).await;
                guard.settle(arrived.is_some());
                Reading::from_entry(&self.store.get(kind), self.clock.now(), threshold)
            }
        }
    }

    /// Typed [`fetch`](Self::fetch) with the default threshold.
    pub async fn fetch_as<T: Telemetry>(&self) -> Option<T> {
        self.fetch(T::KIND, None).await.value_as()
    }

    /// Altitude reading, re-requested while the barometer still reports zero
    /// pressure (it does for a moment after power-up).
    pub async fn fetch_altitude_settled(&self) -> Reading {
        let mut reading = self.fetch(DataType::Altitude, None).await;
        for attempt in 0..self.config.pressure_retries {
            match &reading.payload {
                Some(Payload::Altitude(altitude)) if altitude.pressure != 0.0 => break,
                _ => debug!("Barometer not settled, retry {}", attempt + 1),
            }
            reading = self.read(DataType::Altitude, None, true).await;
        }
        reading
    }

    /// Time since `kind` was last received.
    pub fn age(&self, kind: DataType) -> Option<Duration> {
        self.store.get(kind).age(self.clock.now())
    }

    /// Copy of the request bookkeeping for `kind`.
    pub fn request_state(&self, kind: DataType) -> RequestState {
        self.lock_requests().get(&kind).cloned().unwrap_or_default()
    }

    fn plan(&self, kind: DataType, after: u64, now: Instant) -> Plan {
        let mut requests = self.lock_requests();
        let state = requests.entry(kind).or_default();
        if state.in_flight {
            return Plan::Join { after };
        }
        if let Some(next_allowed) = state.next_allowed_at
            && now < next_allowed
        {
            return Plan::Suppressed;
        }
        state.in_flight = true;
        state.last_request_at = Some(now);
        Plan::Request { after }
    }

    fn record(&self, kind: DataType, arrived: bool) {
        let mut requests = self.lock_requests();
        let state = requests.entry(kind).or_default();
        state.in_flight = false;
        if arrived {
            state.consecutive_failures = 0;
            state.current_backoff = Duration::ZERO;
            state.next_allowed_at = None;
        } else {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            state.current_backoff = self.next_backoff(state.consecutive_failures, state.current_backoff);
            state.next_allowed_at = Some(self.clock.now() + state.current_backoff);
            debug!(
                "{:?} request timed out ({} in a row), backing off {:?}",
                kind, state.consecutive_failures, state.current_backoff
            );
        }
    }

    /// `min(max, base * 2^failures) + jitter`, never below the previous value.
    fn next_backoff(&self, failures: u32, previous: Duration) -> Duration {
        // Shift capped at 16 so the multiplier fits in u32; max_backoff bounds the product
        let growth = 1u32 << failures.min(16);
        let exponential = self.config.base_backoff().saturating_mul(growth).min(self.config.max_backoff());
        let candidate = exponential + self.jitter.jitter(self.config.jitter_max());
        candidate.max(previous)
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, HashMap<DataType, RequestState>> {
        // Bookkeeping stays consistent even if a holder panicked.
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the in-flight flag if a fetch is dropped mid-request.
struct InFlight<'a> {
    cache: &'a TelemetryCache,
    kind: DataType,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, arrived: bool) {
        self.settled = true;
        self.cache.record(self.kind, arrived);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.lock_requests().entry(self.kind).or_default().in_flight = false;
        }
    }
}
