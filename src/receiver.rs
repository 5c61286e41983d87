//! Frame receiver: the long-running task that owns the read side of the link.
//!
//! Bytes flow through a [`FrameParser`], each valid frame is looked up in a
//! [`DispatchTable`] built once at startup, decoded, and written into exactly
//! one [`StateStore`] slot. This task is the only writer of the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec::{self, FrameParser, ParsedFrame, ParserEvent};
use crate::config::LinkConfig;
use crate::error::ProtocolError;
use crate::state::{Domain, StateStore};
use crate::transport::FrameSource;
use crate::types::DataType;

const READ_CHUNK: usize = 256;

/// Whether the transport is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    /// The stream ended, failed repeatedly, or the session shut down.
    Closed,
}

/// What to do with a frame of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Decode and store in the domain's holder.
    Store(Domain),
    /// Host-originated kind echoed back by the link; nothing to store.
    Ignore,
}

/// Kind-to-handler lookup, indexed by wire code.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: [Option<Route>; 256],
}

impl DispatchTable {
    /// Routes for every stored kind plus the host's own command kinds.
    pub fn standard() -> Self {
        let mut routes = [None; 256];
        for domain in Domain::ALL {
            for kind in domain.kinds() {
                routes[usize::from(kind.code())] = Some(Route::Store(domain));
            }
        }
        for kind in [
            DataType::Request,
            DataType::Control,
            DataType::Command,
            DataType::Buzzer,
            DataType::LightMode,
            DataType::LightEvent,
            DataType::LightDefault,
            DataType::DisplayClear,
            DataType::DisplayInvert,
            DataType::DisplayDrawPoint,
            DataType::DisplayDrawLine,
            DataType::DisplayDrawRect,
            DataType::DisplayDrawCircle,
            DataType::DisplayDrawString,
        ] {
            routes[usize::from(kind.code())] = Some(Route::Ignore);
        }
        Self { routes }
    }

    pub fn route(&self, kind: DataType) -> Option<Route> {
        self.routes[usize::from(kind.code())]
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Running counters, readable while the receiver works.
#[derive(Debug, Default)]
pub struct ReceiverStats {
    frames: AtomicU64,
    checksum_failures: AtomicU64,
    decode_failures: AtomicU64,
    unknown_kinds: AtomicU64,
    timeouts: AtomicU64,
    read_errors: AtomicU64,
    discarded_bytes: AtomicU64,
}

/// Point-in-time copy of [`ReceiverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverCounters {
    pub frames: u64,
    pub checksum_failures: u64,
    pub decode_failures: u64,
    pub unknown_kinds: u64,
    pub timeouts: u64,
    pub read_errors: u64,
    pub discarded_bytes: u64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> ReceiverCounters {
        ReceiverCounters {
            frames: self.frames.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            unknown_kinds: self.unknown_kinds.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            discarded_bytes: self.discarded_bytes.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handles to a running receiver task.
pub struct ReceiverHandle {
    /// Link state; flips to `Closed` once when the task ends.
    pub link: watch::Receiver<LinkState>,
    pub stats: Arc<ReceiverStats>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

/// Spawns the receive loop.
pub struct FrameReceiver;

impl FrameReceiver {
    /// Spawn the receiver for `source`, writing into `store`.
    pub fn spawn<S>(source: S, store: Arc<StateStore>, config: &LinkConfig) -> ReceiverHandle
    where
        S: FrameSource,
    {
        let (link_tx, link_rx) = watch::channel(LinkState::Connected);
        let stats = Arc::new(ReceiverStats::default());
        let cancel = CancellationToken::new();

        let parser =
            FrameParser::new(config.max_payload).with_receive_timeout(config.receive_timeout());
        let context = Context {
            table: DispatchTable::standard(),
            store,
            stats: Arc::clone(&stats),
            max_read_errors: config.max_read_errors,
        };

        let cancel_task = cancel.clone();
        let task = tokio::spawn(async move {
            Self::receive_task(source, parser, context, cancel_task).await;
            let _ = link_tx.send_replace(LinkState::Closed);
        });

        ReceiverHandle { link: link_rx, stats, cancel, task }
    }

    async fn receive_task<S>(
        mut source: S,
        mut parser: FrameParser,
        context: Context,
        cancel: CancellationToken,
    ) where
        S: FrameSource,
    {
        info!("Frame receiver started");
        let mut buf = [0u8; READ_CHUNK];
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Frame receiver cancelled");
                    break;
                }
                result = source.read_chunk(&mut buf) => result,
            };

            match result {
                Ok(0) => {
                    info!("Transport stream ended");
                    break;
                }
                Ok(n) => {
                    error_count = 0;
                    trace!("Read {} bytes", n);
                    parser.push(&buf[..n], Instant::now(), |event| context.handle(event));
                    context.stats.discarded_bytes.store(parser.discarded_bytes(), Ordering::Relaxed);
                }
                Err(e) => {
                    error_count += 1;
                    ReceiverStats::bump(&context.stats.read_errors);
                    error!("Transport read error ({}/{}): {}", error_count, context.max_read_errors, e);

                    if error_count >= context.max_read_errors {
                        error!("Too many transport errors, closing link");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!("Frame receiver ended ({} frames dispatched)", context.stats.snapshot().frames);
    }
}

struct Context {
    table: DispatchTable,
    store: Arc<StateStore>,
    stats: Arc<ReceiverStats>,
    max_read_errors: u32,
}

impl Context {
    fn handle(&self, event: ParserEvent) {
        match event {
            ParserEvent::Frame(frame) => self.dispatch(frame),
            ParserEvent::Dropped(err) => {
                let counter = match err {
                    ProtocolError::ChecksumMismatch { .. } => &self.stats.checksum_failures,
                    ProtocolError::UnknownKind(_) | ProtocolError::UnknownDevice(_) => {
                        &self.stats.unknown_kinds
                    }
                    _ => &self.stats.decode_failures,
                };
                ReceiverStats::bump(counter);
                debug!("Dropped frame: {}", err);
            }
            ParserEvent::TimedOut { stage } => {
                ReceiverStats::bump(&self.stats.timeouts);
                warn!("Receive timeout in {:?}, resetting", stage);
            }
        }
    }

    fn dispatch(&self, frame: ParsedFrame) {
        let kind = frame.header.kind;
        match self.table.route(kind) {
            Some(Route::Store(domain)) => match codec::decode_payload(kind, &frame.payload) {
                Ok(payload) => {
                    self.store.set(kind, payload, Instant::now());
                    ReceiverStats::bump(&self.stats.frames);
                    trace!("{:?} from {:?} stored in {:?}", kind, frame.header.source, domain);
                }
                Err(e) => {
                    ReceiverStats::bump(&self.stats.decode_failures);
                    warn!("Dropping undecodable {:?} frame: {}", kind, e);
                }
            },
            Some(Route::Ignore) => trace!("Ignoring echoed {:?} frame", kind),
            None => {
                ReceiverStats::bump(&self.stats.unknown_kinds);
                debug!("No handler for {:?} ({} bytes)", kind, frame.payload.len());
            }
        }
    }
}
