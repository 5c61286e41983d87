//! Test doubles for driving a session without hardware.
//!
//! - [`ManualClock`] and [`FixedJitter`] make cache timing deterministic
//! - [`CapturedSink`] records outbound bytes and parses them back into frames,
//!   optionally accepting a single byte per write to expose interleaving
//! - [`FakeDevice`] plays the drone on the far end of a `tokio::io::duplex` pipe

#![cfg(any(test, feature = "benchmark"))]

use anyhow::{Context as _, bail};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{Clock, Jitter};
use crate::codec::telemetry::Ack;
use crate::codec::{self, FrameParser, MAX_PAYLOAD, ParsedFrame, ParserEvent, Payload};
use crate::types::{DataType, DeviceType, Header};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Starts at the current tokio time.
    pub fn new() -> Self {
        Self { now: Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Jitter that always returns the same offset, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl Jitter for FixedJitter {
    fn jitter(&self, max: Duration) -> Duration {
        self.0.min(max)
    }
}

/// Frame as the drone would send it to the host.
pub fn device_frame(payload: &Payload) -> Bytes {
    let header = Header::new(payload.kind(), 0, DeviceType::Drone, DeviceType::Base);
    codec::encode_frame(header, payload).unwrap_or_default()
}

/// Parse a captured byte stream into frames, also returning the number of drops.
pub fn parse_frames(bytes: &[u8]) -> (Vec<ParsedFrame>, usize) {
    let mut parser = FrameParser::new(MAX_PAYLOAD);
    let mut frames = Vec::new();
    let mut dropped = 0;
    parser.push(bytes, Instant::now(), |event| match event {
        ParserEvent::Frame(frame) => frames.push(frame),
        ParserEvent::Dropped(_) | ParserEvent::TimedOut { .. } => dropped += 1,
    });
    (frames, dropped)
}

/// In-memory write side.
///
/// The default sink takes whole buffers. A [`trickling`](Self::trickling)
/// sink takes one byte per write and returns `Pending` between bytes, so a
/// frame spans many polls and any other writer gets a chance to run.
#[derive(Debug, Clone, Default)]
pub struct CapturedSink {
    bytes: Arc<Mutex<Vec<u8>>>,
    trickle: bool,
    yielded: bool,
}

impl CapturedSink {
    pub fn trickling() -> Self {
        Self { trickle: true, ..Self::default() }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn frames(&self) -> Vec<ParsedFrame> {
        parse_frames(&self.bytes()).0
    }

    /// Frames in the capture that failed to parse.
    pub fn dropped(&self) -> usize {
        parse_frames(&self.bytes()).1
    }
}

impl AsyncWrite for CapturedSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.trickle || buf.is_empty() {
            this.bytes.lock().unwrap_or_else(|p| p.into_inner()).extend_from_slice(buf);
            return Poll::Ready(Ok(buf.len()));
        }
        if !this.yielded {
            this.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        this.yielded = false;
        this.bytes.lock().unwrap_or_else(|p| p.into_inner()).push(buf[0]);
        Poll::Ready(Ok(1))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// The drone end of an in-memory link.
pub struct FakeDevice {
    reader: ReadHalf<DuplexStream>,
    writer: WriteHalf<DuplexStream>,
    parser: FrameParser,
    pending: VecDeque<ParsedFrame>,
}

impl FakeDevice {
    /// Create a device and the host-side stream connected to it.
    pub fn connect() -> (Self, DuplexStream) {
        let (device, host) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(device);
        let device = Self { reader, writer, parser: FrameParser::new(MAX_PAYLOAD), pending: VecDeque::new() };
        (device, host)
    }

    /// Next valid frame written by the host.
    pub async fn next_frame(&mut self) -> anyhow::Result<ParsedFrame> {
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let n = self.reader.read(&mut buf).await.context("reading host bytes")?;
            if n == 0 {
                bail!("host closed the link");
            }
            let pending = &mut self.pending;
            self.parser.push(&buf[..n], Instant::now(), |event| {
                if let ParserEvent::Frame(frame) = event {
                    pending.push_back(frame);
                }
            });
        }
    }

    /// Next host frame, decoded.
    pub async fn next_payload(&mut self) -> anyhow::Result<Payload> {
        let frame = self.next_frame().await?;
        Ok(codec::decode_payload(frame.header.kind, &frame.payload)?)
    }

    pub async fn send(&mut self, payload: &Payload) -> anyhow::Result<()> {
        self.send_raw(&device_frame(payload)).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Answer requests from `responses` and acknowledge every other command
    /// until the host disconnects.
    pub fn serve(mut self, responses: HashMap<DataType, Payload>) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let mut system_time = 0u32;
            while let Ok(payload) = self.next_payload().await {
                system_time = system_time.wrapping_add(1);
                match payload {
                    Payload::Request(request) => {
                        if let Some(reply) = responses.get(&request.data_type) {
                            self.send(reply).await?;
                        }
                    }
                    other => {
                        let ack = Ack { system_time, data_type: other.kind() };
                        self.send(&Payload::Ack(ack)).await?;
                    }
                }
            }
            Ok(())
        })
    }
}
