//! Incremental frame parser.
//!
//! The parser is a byte-at-a-time state machine that survives noise, corrupt
//! frames and stalled transfers without needing a reconnect:
//!
//! ```text
//! SeekStart -> ReadHeader -> ReadPayload -> Validate -> (frame) -> SeekStart
//!      ^            |                           |
//!      +------------+------- drop + resync -----+
//! ```
//!
//! It does not decode payloads; that happens at dispatch so a frame with an
//! unknown kind still costs nothing more than a CRC check.

use bytes::{BufMut, Bytes, BytesMut};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::{CHECKSUM_SIZE, START_MARKER, checksum};
use crate::error::ProtocolError;
use crate::types::Header;

/// Current state of the framing machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStage {
    SeekStart,
    ReadHeader,
    ReadPayload,
    Validate,
}

/// A checksum-valid frame, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub header: Header,
    pub payload: Bytes,
}

/// Output of [`FrameParser::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserEvent {
    Frame(ParsedFrame),
    /// A frame was discarded; the parser is back in `SeekStart`.
    Dropped(ProtocolError),
    /// A partial frame stalled longer than the receive timeout.
    TimedOut { stage: ParserStage },
}

/// Framing state machine over a raw byte stream.
#[derive(Debug)]
pub struct FrameParser {
    stage: ParserStage,
    /// Previous byte was the first marker byte.
    half_marker: bool,
    /// Header, payload and checksum bytes of the frame in progress.
    buf: BytesMut,
    header: Option<Header>,
    started_at: Option<Instant>,
    max_payload: usize,
    receive_timeout: Duration,
    discarded: u64,
}

impl FrameParser {
    pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(600);

    pub fn new(max_payload: usize) -> Self {
        Self {
            stage: ParserStage::SeekStart,
            half_marker: false,
            buf: BytesMut::with_capacity(Header::SIZE + max_payload + CHECKSUM_SIZE),
            header: None,
            started_at: None,
            max_payload,
            receive_timeout: Self::DEFAULT_RECEIVE_TIMEOUT,
            discarded: 0,
        }
    }

    /// Abandon a partial frame that has not completed within `timeout`.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn stage(&self) -> ParserStage {
        self.stage
    }

    /// Noise bytes skipped while seeking a start marker.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Return to `SeekStart`, dropping any partial frame.
    pub fn reset(&mut self) {
        self.stage = ParserStage::SeekStart;
        self.half_marker = false;
        self.buf.clear();
        self.header = None;
        self.started_at = None;
    }

    /// Feed bytes read at `now`, reporting each completed or dropped frame.
    pub fn push(&mut self, bytes: &[u8], now: Instant, mut on_event: impl FnMut(ParserEvent)) {
        if let Some(started) = self.started_at
            && now.duration_since(started) > self.receive_timeout
        {
            let stage = self.stage;
            trace!("Partial frame timed out in {:?}", stage);
            self.reset();
            on_event(ParserEvent::TimedOut { stage });
        }

        for &byte in bytes {
            if let Some(event) = self.step(byte, now) {
                on_event(event);
            }
        }
    }

    /// Convenience wrapper around [`push`](Self::push) that collects events.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        self.push(bytes, now, |event| events.push(event));
        events
    }

    fn step(&mut self, byte: u8, now: Instant) -> Option<ParserEvent> {
        match self.stage {
            ParserStage::SeekStart => {
                if self.half_marker && byte == START_MARKER[1] {
                    self.half_marker = false;
                    self.stage = ParserStage::ReadHeader;
                    self.started_at = Some(now);
                    self.buf.clear();
                } else {
                    if self.half_marker {
                        self.discarded += 1;
                    }
                    self.half_marker = byte == START_MARKER[0];
                    if !self.half_marker {
                        self.discarded += 1;
                    }
                }
                None
            }
            ParserStage::ReadHeader => {
                self.buf.put_u8(byte);
                if self.buf.len() < Header::SIZE {
                    return None;
                }
                let raw = [self.buf[0], self.buf[1], self.buf[2], self.buf[3]];
                match Header::from_bytes(raw) {
                    Ok(header) if usize::from(header.length) > self.max_payload => {
                        self.reset();
                        Some(ParserEvent::Dropped(ProtocolError::PayloadTooLarge {
                            length: header.length.into(),
                            limit: self.max_payload,
                        }))
                    }
                    Ok(header) => {
                        self.stage = if header.length == 0 {
                            ParserStage::Validate
                        } else {
                            ParserStage::ReadPayload
                        };
                        self.header = Some(header);
                        None
                    }
                    Err(err) => {
                        self.reset();
                        Some(ParserEvent::Dropped(err))
                    }
                }
            }
            ParserStage::ReadPayload => {
                self.buf.put_u8(byte);
                let length = self.header.map_or(0, |h| usize::from(h.length));
                if self.buf.len() == Header::SIZE + length {
                    self.stage = ParserStage::Validate;
                }
                None
            }
            ParserStage::Validate => {
                self.buf.put_u8(byte);
                let header = self.header?;
                let body_end = Header::SIZE + usize::from(header.length);
                if self.buf.len() < body_end + CHECKSUM_SIZE {
                    return None;
                }

                let frame = self.buf.split().freeze();
                let received = u16::from_le_bytes([frame[body_end], frame[body_end + 1]]);
                let calculated = checksum(&frame[..Header::SIZE], &frame[Header::SIZE..body_end]);
                self.reset();

                if received == calculated {
                    Some(ParserEvent::Frame(ParsedFrame {
                        header,
                        payload: frame.slice(Header::SIZE..body_end),
                    }))
                } else {
                    Some(ParserEvent::Dropped(ProtocolError::ChecksumMismatch {
                        received,
                        calculated,
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{MAX_PAYLOAD, encode_raw_frame};
    use crate::types::{DataType, DeviceType};
    use proptest::prelude::*;

    fn frame(kind: DataType, body: &[u8]) -> Vec<u8> {
        encode_raw_frame(kind, DeviceType::Drone, DeviceType::Base, body).unwrap().to_vec()
    }

    fn frames_of(events: &[ParserEvent]) -> Vec<ParsedFrame> {
        events
            .iter()
            .filter_map(|e| match e {
                ParserEvent::Frame(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_single_frame() {
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let events = parser.feed(&frame(DataType::Rssi, &[0xB5]), Instant::now());
        assert_eq!(events.len(), 1);
        let ParserEvent::Frame(parsed) = &events[0] else { panic!("expected frame") };
        assert_eq!(parsed.header.kind, DataType::Rssi);
        assert_eq!(parsed.header.source, DeviceType::Drone);
        assert_eq!(parsed.payload.as_ref(), &[0xB5]);
        assert_eq!(parser.stage(), ParserStage::SeekStart);
    }

    #[test]
    fn corrupt_frame_then_valid_frame() {
        let mut corrupt = frame(DataType::Attitude, &[1, 0, 2, 0, 3, 0]);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        let valid = frame(DataType::Attitude, &[4, 0, 5, 0, 6, 0]);

        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let mut stream = corrupt;
        stream.extend_from_slice(&valid);
        let events = parser.feed(&stream, Instant::now());

        assert!(matches!(events[0], ParserEvent::Dropped(ProtocolError::ChecksumMismatch { .. })));
        let frames = frames_of(&events);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), &[4, 0, 5, 0, 6, 0]);
    }

    #[test]
    fn zero_length_payload_goes_straight_to_checksum() {
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let events = parser.feed(&frame(DataType::Ping, &[]), Instant::now());
        let frames = frames_of(&events);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn unknown_kind_is_dropped_and_resynchronized() {
        let mut bogus = vec![0x0A, 0x55, 0xEE, 1, 0x10, 0x70, 0x00, 0x00, 0x00];
        bogus.extend_from_slice(&frame(DataType::Rssi, &[0xC0]));

        let mut parser = FrameParser::new(MAX_PAYLOAD);
        let events = parser.feed(&bogus, Instant::now());
        assert_eq!(events[0], ParserEvent::Dropped(ProtocolError::UnknownKind(0xEE)));
        assert_eq!(frames_of(&events).len(), 1);
    }

    #[test]
    fn oversized_length_is_dropped() {
        let mut parser = FrameParser::new(16);
        let events = parser.feed(&[0x0A, 0x55, 0x43, 200, 0x10, 0x70], Instant::now());
        assert_eq!(
            events,
            vec![ParserEvent::Dropped(ProtocolError::PayloadTooLarge { length: 200, limit: 16 })]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_frame_times_out() {
        let bytes = frame(DataType::Trim, &[0; 8]);
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        assert!(parser.feed(&bytes[..5], Instant::now()).is_empty());
        assert_eq!(parser.stage(), ParserStage::ReadHeader);

        tokio::time::advance(Duration::from_millis(700)).await;
        let mut events = parser.feed(&bytes[5..], Instant::now());
        assert_eq!(events.remove(0), ParserEvent::TimedOut { stage: ParserStage::ReadHeader });
        assert!(frames_of(&events).is_empty());

        let events = parser.feed(&bytes, Instant::now());
        assert_eq!(frames_of(&events).len(), 1);
    }

    #[test]
    fn noise_is_counted() {
        let mut parser = FrameParser::new(MAX_PAYLOAD);
        parser.feed(&[0x00, 0x0A, 0x01, 0xFF], Instant::now());
        assert_eq!(parser.discarded_bytes(), 4);
    }

    proptest! {
        #[test]
        fn prop_frames_survive_noise_and_chunking(
            noise in prop::collection::vec(any::<u8>().prop_filter("marker", |b| *b != 0x0A), 0..64),
            bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..6),
            chunk in 1usize..17,
        ) {
            let mut stream = noise;
            for body in &bodies {
                stream.extend_from_slice(&frame(DataType::Message, body));
            }

            let now = Instant::now();
            let mut parser = FrameParser::new(MAX_PAYLOAD);
            let mut events = Vec::new();
            for piece in stream.chunks(chunk) {
                events.extend(parser.feed(piece, now));
            }

            let frames = frames_of(&events);
            prop_assert_eq!(frames.len(), bodies.len());
            for (parsed, body) in frames.iter().zip(&bodies) {
                prop_assert_eq!(parsed.payload.as_ref(), body.as_slice());
            }
        }
    }
}
