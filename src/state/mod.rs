//! Live picture of the drone: one slot per data kind.
//!
//! Slots are grouped into three holders by domain and created once, absent,
//! when the store is built. Each slot is a `tokio::sync::watch` channel
//! carrying an `Arc<StateEntry>`, which gives:
//!
//! - whole-value replacement with no partial-field visibility
//! - `get` that never blocks on I/O and never waits for the writer
//! - a per-kind change notification for bounded waits
//!
//! Only the frame receiver writes; everything else reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

use crate::codec::Payload;
use crate::codec::telemetry::{
    Ack, Address, Altitude, Attitude, Button, CardColor, Count, ErrorReport, Flow, Information,
    Joystick, Motion, Position, Range, RawFlow, RawMotion, Rssi, State, Trim,
};
use crate::types::DataType;

mod entry;

pub use entry::StateEntry;

/// Logical grouping of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Flight and sensor status.
    Flight,
    /// Link quality, inventory and device-reported errors.
    Link,
    /// Controller buttons and sticks.
    Controller,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Flight, Domain::Link, Domain::Controller];

    /// Kinds stored in this domain.
    pub fn kinds(self) -> &'static [DataType] {
        match self {
            Domain::Flight => &[
                DataType::State,
                DataType::Attitude,
                DataType::Position,
                DataType::Altitude,
                DataType::Motion,
                DataType::RawMotion,
                DataType::Range,
                DataType::Flow,
                DataType::RawFlow,
                DataType::Trim,
                DataType::CardColor,
            ],
            Domain::Link => &[
                DataType::Information,
                DataType::Address,
                DataType::Count,
                DataType::Rssi,
                DataType::Error,
                DataType::Ack,
            ],
            Domain::Controller => &[DataType::Button, DataType::Joystick],
        }
    }

    /// Domain holding `kind`, if the kind is stored at all.
    pub fn of(kind: DataType) -> Option<Domain> {
        Domain::ALL.into_iter().find(|domain| domain.kinds().contains(&kind))
    }
}

type Slot = watch::Sender<Arc<StateEntry>>;

/// Fixed set of slots for one domain.
#[derive(Debug)]
pub struct Holder {
    domain: Domain,
    slots: HashMap<DataType, Slot>,
}

impl Holder {
    fn new(domain: Domain) -> Self {
        let absent = Arc::new(StateEntry::absent());
        let slots = domain
            .kinds()
            .iter()
            .map(|&kind| (kind, watch::Sender::new(Arc::clone(&absent))))
            .collect();
        Self { domain, slots }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Current snapshot for `kind`, or `None` if this holder has no such slot.
    pub fn get(&self, kind: DataType) -> Option<Arc<StateEntry>> {
        self.slots.get(&kind).map(|slot| Arc::clone(&slot.borrow()))
    }

    fn set(&self, kind: DataType, payload: Payload, now: Instant) -> Option<u64> {
        let slot = self.slots.get(&kind)?;
        let mut sequence = 0;
        slot.send_modify(|entry| {
            let next = entry.next(payload, now);
            sequence = next.sequence;
            *entry = Arc::new(next);
        });
        Some(sequence)
    }
}

/// All holders for one session.
#[derive(Debug)]
pub struct StateStore {
    flight: Holder,
    link: Holder,
    controller: Holder,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            flight: Holder::new(Domain::Flight),
            link: Holder::new(Domain::Link),
            controller: Holder::new(Domain::Controller),
        }
    }

    pub fn holder(&self, domain: Domain) -> &Holder {
        match domain {
            Domain::Flight => &self.flight,
            Domain::Link => &self.link,
            Domain::Controller => &self.controller,
        }
    }

    fn slot(&self, kind: DataType) -> Option<&Slot> {
        Domain::of(kind).and_then(|domain| self.holder(domain).slots.get(&kind))
    }

    /// Whether `kind` has a slot.
    pub fn stores(&self, kind: DataType) -> bool {
        self.slot(kind).is_some()
    }

    /// Current snapshot for `kind`.
    ///
    /// Never blocks and never performs I/O. Kinds that are not stored, or have
    /// not arrived yet, yield the absent sentinel.
    pub fn get(&self, kind: DataType) -> Arc<StateEntry> {
        match self.slot(kind) {
            Some(slot) => Arc::clone(&slot.borrow()),
            None => Arc::new(StateEntry::absent()),
        }
    }

    /// Typed view of the current value.
    pub fn get_as<T: Telemetry>(&self) -> Option<T> {
        self.get(T::KIND).value.as_ref().and_then(T::from_payload)
    }

    /// Replace the entry for `kind`, stamping it with `now`.
    ///
    /// Returns the new sequence number, or `None` if `kind` has no slot.
    pub(crate) fn set(&self, kind: DataType, payload: Payload, now: Instant) -> Option<u64> {
        let domain = Domain::of(kind)?;
        let sequence = self.holder(domain).set(kind, payload, now)?;
        trace!("{:?} slot in {:?} now at sequence {}", kind, domain, sequence);
        Some(sequence)
    }

    /// Change notifications for one slot.
    pub fn subscribe(&self, kind: DataType) -> Option<watch::Receiver<Arc<StateEntry>>> {
        self.slot(kind).map(|slot| slot.subscribe())
    }

    /// Wait until the slot's sequence passes `after`, for at most `timeout`.
    ///
    /// Returns the advanced entry, or `None` on timeout or if `kind` has no slot.
    pub async fn wait_for(
        &self,
        kind: DataType,
        after: u64,
        timeout: Duration,
    ) -> Option<Arc<StateEntry>> {
        let mut rx = self.subscribe(kind)?;
        let deadline = Instant::now() + timeout;
        loop {
            {
                let entry = rx.borrow_and_update();
                if entry.sequence > after {
                    return Some(Arc::clone(&entry));
                }
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => return None,
            }
        }
    }
}

/// A payload struct with its own slot.
pub trait Telemetry: Sized {
    const KIND: DataType;

    fn from_payload(payload: &Payload) -> Option<Self>;
}

macro_rules! telemetry {
    ($($ty:ident => $variant:ident),+ $(,)?) => {
        $(
            impl Telemetry for $ty {
                const KIND: DataType = DataType::$variant;

                fn from_payload(payload: &Payload) -> Option<Self> {
                    match payload {
                        Payload::$variant(value) => Some(value.clone()),
                        _ => None,
                    }
                }
            }
        )+
    };
}

telemetry! {
    State => State,
    Attitude => Attitude,
    Position => Position,
    Altitude => Altitude,
    Motion => Motion,
    RawMotion => RawMotion,
    Range => Range,
    Flow => Flow,
    RawFlow => RawFlow,
    Trim => Trim,
    CardColor => CardColor,
    Information => Information,
    Address => Address,
    Count => Count,
    Rssi => Rssi,
    ErrorReport => Error,
    Ack => Ack,
    Button => Button,
    Joystick => Joystick,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::telemetry::{Attitude, Rssi};

    fn attitude(n: i16) -> Payload {
        Payload::Attitude(Attitude { roll: n, pitch: n, yaw: n })
    }

    #[test]
    fn every_stored_kind_has_one_domain() {
        let mut seen = std::collections::HashSet::new();
        for domain in Domain::ALL {
            for kind in domain.kinds() {
                assert!(seen.insert(*kind), "{kind:?} stored twice");
                assert!(crate::codec::has_schema(*kind), "{kind:?} has no decoder");
            }
        }
        assert_eq!(Domain::of(DataType::Button), Some(Domain::Controller));
        assert_eq!(Domain::of(DataType::Buzzer), None);
    }

    #[tokio::test]
    async fn slots_start_absent() {
        let store = StateStore::new();
        let entry = store.get(DataType::Button);
        assert_eq!(*entry, StateEntry::absent());
        assert!(store.get_as::<Rssi>().is_none());
        assert!(!store.get(DataType::Buzzer).is_present());
        assert!(store.holder(Domain::Controller).get(DataType::Joystick).is_some());
        assert!(store.holder(Domain::Controller).get(DataType::Altitude).is_none());
    }

    #[tokio::test]
    async fn set_replaces_value_and_advances_sequence() {
        let store = StateStore::new();
        let now = Instant::now();
        assert_eq!(store.set(DataType::Attitude, attitude(1), now), Some(1));
        assert_eq!(store.set(DataType::Attitude, attitude(2), now), Some(2));

        let entry = store.get(DataType::Attitude);
        assert_eq!(entry.value, Some(attitude(2)));
        assert_eq!(entry.received_at, Some(now));
        assert_eq!(store.get_as::<Attitude>().map(|a| a.roll), Some(2));

        assert_eq!(store.set(DataType::Buzzer, attitude(3), now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_is_bounded() {
        let store = StateStore::new();
        let started = Instant::now();
        assert!(store.wait_for(DataType::Rssi, 0, Duration::from_millis(150)).await.is_none());
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_sees_later_receipt() {
        let store = Arc::new(StateStore::new());
        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set(DataType::Rssi, Payload::Rssi(Rssi { rssi: -60 }), Instant::now());
        });

        let entry = store.wait_for(DataType::Rssi, 0, Duration::from_millis(100)).await.unwrap();
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.value, Some(Payload::Rssi(Rssi { rssi: -60 })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_observe_mixed_fields() {
        let store = Arc::new(StateStore::new());

        let writer = Arc::clone(&store);
        let write_task = tokio::spawn(async move {
            for n in 0..5_000i16 {
                writer.set(DataType::Attitude, attitude(n), Instant::now());
                if n % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let reader = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut last_sequence = 0;
                    for _ in 0..5_000 {
                        let entry = reader.get(DataType::Attitude);
                        if let Some(Payload::Attitude(a)) = &entry.value {
                            assert_eq!(a.roll, a.pitch);
                            assert_eq!(a.pitch, a.yaw);
                            assert_eq!(i64::from(a.roll) + 1, entry.sequence as i64);
                        }
                        assert!(entry.sequence >= last_sequence);
                        last_sequence = entry.sequence;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        write_task.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
