//! Subscription streams over state slots.

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::state::StateEntry;
use crate::types::UpdateRate;

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

/// Receipts from one slot, delivered at most at `rate`.
///
/// The current value is yielded first if the kind has already arrived. The
/// absent placeholder is never yielded.
pub fn entry_updates(
    slot: watch::Receiver<Arc<StateEntry>>,
    rate: UpdateRate,
) -> BoxStream<'static, Arc<StateEntry>> {
    let entries = WatchStream::new(slot)
        .filter(|entry| futures::future::ready(entry.is_present()));

    match rate.throttle_interval() {
        None => entries.boxed(),
        Some(period) => entries.throttle(period).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Payload;
    use crate::codec::telemetry::Rssi;
    use std::time::Duration;
    use tokio::time::Instant;

    fn rssi(n: i8) -> Arc<StateEntry> {
        Arc::new(StateEntry::absent().next(Payload::Rssi(Rssi { rssi: n }), Instant::now()))
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_keeps_latest() {
        let items = tokio_stream::iter([1, 2, 3]);
        let out: Vec<_> = items.throttle(Duration::from_millis(100)).collect().await;
        assert_eq!(out, vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_emissions() {
        let (tx, rx) = watch::channel(0u32);
        let mut throttled = WatchStream::new(rx).throttle(Duration::from_millis(100));

        assert_eq!(throttled.next().await, Some(0));
        let started = Instant::now();
        tx.send_replace(1);
        tx.send_replace(2);
        assert_eq!(throttled.next().await, Some(2));
        assert!(started.elapsed() >= Duration::from_millis(100));

        drop(tx);
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test]
    async fn absent_entries_are_skipped() {
        let (tx, rx) = watch::channel(Arc::new(StateEntry::absent()));
        let mut updates = entry_updates(rx, UpdateRate::Native);

        tx.send_replace(rssi(-50));
        let entry = tokio::time::timeout(Duration::from_secs(1), updates.next()).await.unwrap().unwrap();
        assert_eq!(entry.value, Some(Payload::Rssi(Rssi { rssi: -50 })));
    }

    #[tokio::test(start_paused = true)]
    async fn max_rate_throttles() {
        let (tx, rx) = watch::channel(rssi(-40));
        let mut updates = entry_updates(rx, UpdateRate::Max(10));
        assert!(updates.next().await.is_some());

        let started = Instant::now();
        tx.send_replace(rssi(-41));
        tx.send_replace(rssi(-42));
        let entry = updates.next().await.unwrap();
        assert_eq!(entry.value, Some(Payload::Rssi(Rssi { rssi: -42 })));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
