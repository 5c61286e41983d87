//! End-to-end scenarios through the public API over an in-memory link.

use codrone_link::codec::outbound::{Buzzer, DisplayDrawString};
use codrone_link::codec::telemetry::{Altitude, Rssi};
use codrone_link::codec::{self, FrameParser, MAX_PAYLOAD, ParserEvent, Payload};
use codrone_link::types::{BuzzerMode, DataType, DeviceType, DisplayFont, DisplayPixel, Header};
use codrone_link::{Drone, Freshness, LinkConfig, LinkState};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

fn to_host(payload: &Payload) -> Vec<u8> {
    let header = Header::new(payload.kind(), 0, DeviceType::Drone, DeviceType::Base);
    codec::encode_frame(header, payload).unwrap().to_vec()
}

/// Reads host frames on the device end and records them.
fn record_host_frames(
    mut reader: tokio::io::ReadHalf<DuplexStream>,
) -> (Arc<Mutex<Vec<Payload>>>, tokio::task::JoinHandle<usize>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let task = tokio::spawn(async move {
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let mut buf = [0u8; 512];
        let mut dropped = 0;
        while let Ok(n) = reader.read(&mut buf).await {
            if n == 0 {
                break;
            }
            for event in parser.feed(&buf[..n], tokio::time::Instant::now()) {
                match event {
                    ParserEvent::Frame(frame) => {
                        let payload = codec::decode_payload(frame.header.kind, &frame.payload).unwrap();
                        sink.lock().await.push(payload);
                    }
                    _ => dropped += 1,
                }
            }
        }
        dropped
    });
    (seen, task)
}

#[tokio::test]
async fn altitude_scenario_then_cache_hit() {
    let _ = tracing_subscriber::fmt::try_init();

    let (device, host) = tokio::io::duplex(4096);
    let (mut device_rx, mut device_tx) = tokio::io::split(device);
    let config = LinkConfig { command_interval_ms: 0, ..LinkConfig::default() };
    let session = Drone::open(host, config).await.unwrap();

    let altitude = Payload::Altitude(Altitude {
        temperature: 25.0,
        pressure: 101_325.0,
        altitude: 400.0,
        range_height: 500.0,
    });

    // Answer the first Request with an Altitude frame, count the rest
    let reply = to_host(&altitude);
    let device_task = tokio::spawn(async move {
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let mut buf = [0u8; 256];
        let mut requests = 0;
        while let Ok(n) = device_rx.read(&mut buf).await {
            if n == 0 {
                break;
            }
            for event in parser.feed(&buf[..n], tokio::time::Instant::now()) {
                if let ParserEvent::Frame(frame) = event
                    && frame.header.kind == DataType::Request
                {
                    requests += 1;
                    device_tx.write_all(&reply).await.unwrap();
                }
            }
        }
        requests
    });

    let first = session.fetch(DataType::Altitude).await;
    assert_eq!(first.freshness, Freshness::Fresh);
    assert_eq!(first.payload, Some(altitude.clone()));

    let second = session.fetch(DataType::Altitude).await;
    assert_eq!(second.payload, Some(altitude));
    assert!(second.is_fresh());

    drop(session);
    let requests = tokio::time::timeout(Duration::from_secs(1), device_task).await.unwrap().unwrap();
    assert_eq!(requests, 1);
}

#[tokio::test]
async fn noise_and_corruption_do_not_stop_the_link() {
    let (device, host) = tokio::io::duplex(4096);
    let (_device_rx, mut device_tx) = tokio::io::split(device);
    let session = Drone::open(host, LinkConfig::default()).await.unwrap();

    let mut stream = vec![0x00, 0xFF, 0x13, 0x37];
    let mut corrupt = to_host(&Payload::Rssi(Rssi { rssi: -70 }));
    let last = corrupt.len() - 1;
    corrupt[last] ^= 0x01;
    stream.extend_from_slice(&corrupt);
    stream.extend_from_slice(&to_host(&Payload::Rssi(Rssi { rssi: -48 })));
    device_tx.write_all(&stream).await.unwrap();

    let entry = session.store().wait_for(DataType::Rssi, 0, Duration::from_secs(1)).await.unwrap();
    assert_eq!(entry.value, Some(Payload::Rssi(Rssi { rssi: -48 })));
    let stats = session.stats();
    assert_eq!(stats.checksum_failures, 1);
    assert_eq!(stats.frames, 1);
    assert_eq!(session.link_state(), LinkState::Connected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_arrive_whole() {
    // A one-byte pipe forces every frame through many partial writes
    let (device, host) = tokio::io::duplex(1);
    let (device_rx, _device_tx) = tokio::io::split(device);
    let (seen, reader) = record_host_frames(device_rx);

    let config = LinkConfig { command_interval_ms: 0, ..LinkConfig::default() };
    let session = Arc::new(Drone::open(host, config).await.unwrap());

    let buzz = Payload::Buzzer(Buzzer { mode: BuzzerMode::Scale, value: 45, time: 80 });
    let draw = Payload::DisplayDrawString(DisplayDrawString {
        x: 4,
        y: 12,
        font: DisplayFont::LiberationMono10x16,
        pixel: DisplayPixel::White,
        text: "CoDrone".into(),
    });

    let tasks: Vec<_> = [buzz.clone(), draw.clone()]
        .into_iter()
        .map(|payload| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                for _ in 0..25 {
                    session.send(&payload).await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    drop(session);
    let dropped = tokio::time::timeout(Duration::from_secs(2), reader).await.unwrap().unwrap();
    assert_eq!(dropped, 0);

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 50);
    assert_eq!(seen.iter().filter(|p| **p == buzz).count(), 25);
    assert_eq!(seen.iter().filter(|p| **p == draw).count(), 25);
}

#[tokio::test]
async fn yaml_config_drives_session() {
    let config = LinkConfig::from_yaml(
        "command_interval_ms: 0\ntelemetry:\n  request_timeout_ms: 50\n",
    )
    .unwrap();
    let (_device, host) = tokio::io::duplex(1024);
    let session = Drone::open(host, config).await.unwrap();

    let started = std::time::Instant::now();
    let reading = session.fetch(DataType::State).await;
    assert_eq!(reading.freshness, Freshness::Absent);
    assert!(started.elapsed() < Duration::from_millis(500));
}
