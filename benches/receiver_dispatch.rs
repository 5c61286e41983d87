//! Benchmarks for the receive path
//!
//! Measures end-to-end latency from bytes written by the device to the
//! value being visible in the state store, and the cost of a cached read.

use codrone_link::codec::Payload;
use codrone_link::codec::telemetry::{Attitude, Rssi};
use codrone_link::test_utils::FakeDevice;
use codrone_link::types::DataType;
use codrone_link::{LinkConfig, Session};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn bench_frame_to_store(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (mut device, session) = runtime.block_on(async {
        let (device, host) = FakeDevice::connect();
        let session = Session::open(host, LinkConfig::default()).await.unwrap();
        (device, session)
    });

    let mut group = c.benchmark_group("receiver");
    let mut n = 0i16;
    group.bench_function("frame_to_store", |b| {
        b.iter(|| {
            runtime.block_on(async {
                n = n.wrapping_add(1);
                let before = session.state(DataType::Attitude).sequence;
                let attitude = Payload::Attitude(Attitude { roll: n, pitch: 0, yaw: 0 });
                device.send(&attitude).await.unwrap();
                session.store().wait_for(DataType::Attitude, before, Duration::from_secs(1)).await
            })
        })
    });
    group.finish();
}

fn bench_cached_fetch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (_device, session) = runtime.block_on(async {
        let (mut device, host) = FakeDevice::connect();
        let session = Session::open(host, LinkConfig::default()).await.unwrap();
        device.send(&Payload::Rssi(Rssi { rssi: -45 })).await.unwrap();
        session.store().wait_for(DataType::Rssi, 0, Duration::from_secs(1)).await;
        (device, session)
    });

    let mut group = c.benchmark_group("cache");
    group.bench_function("fresh_fetch", |b| {
        b.iter(|| runtime.block_on(session.fetch_within(black_box(DataType::Rssi), Duration::from_secs(3600))))
    });
    group.bench_function("state_snapshot", |b| b.iter(|| session.state(black_box(DataType::Rssi))));
    group.finish();
}

criterion_group!(benches, bench_frame_to_store, bench_cached_fetch);
criterion_main!(benches);
