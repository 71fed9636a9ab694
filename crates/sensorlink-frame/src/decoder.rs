use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::checksum::checksum;
use crate::codec::{Frame, FramingProfile, MAX_PAYLOAD};
use crate::error::{FrameError, Result};
use crate::frame_type::{FrameType, HEADER};

/// A byte-at-a-time frame decoder for one framing profile.
///
/// Decoders never block and never emit a partially read frame. After any
/// rejected frame they are back at their initial scanning state.
pub trait StreamDecoder: Send {
    /// Feed one byte. Returns a frame or a recovered fault when one completes.
    ///
    /// One byte can complete more than one result. The first is returned
    /// here and the rest are queued for [`StreamDecoder::take_ready`].
    fn push(&mut self, byte: u8) -> Option<Result<Frame>>;

    /// Next queued result from an earlier `push`. Drain before pushing again.
    fn take_ready(&mut self) -> Option<Result<Frame>> {
        None
    }

    /// Abandon any in-progress frame because the source starved or closed.
    ///
    /// Returns `IncompleteFrame` if a frame was in progress.
    fn abort(&mut self) -> Option<FrameError>;

    /// True while scanning for the start of the next frame.
    fn is_idle(&self) -> bool;

    /// Running counters since construction.
    fn stats(&self) -> &DecodeStats;

    /// The profile this decoder implements.
    fn profile(&self) -> FramingProfile;
}

/// Running decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Frames emitted.
    pub frames: u64,
    /// Bytes skipped while scanning for a frame start.
    pub bytes_discarded: u64,
    /// Times scanning skipped at least one byte before finding a header.
    pub sync_losses: u64,
    /// Frames rejected for a bad checksum.
    pub checksum_mismatches: u64,
    /// Unrecognized type bytes.
    pub unknown_types: u64,
    /// Frames abandoned because the source starved.
    pub incomplete_frames: u64,
}

impl DecodeStats {
    /// Total number of rejected or abandoned frames.
    ///
    /// Sync losses are not counted: skipped bytes never formed a frame.
    pub fn faults(&self) -> u64 {
        self.checksum_mismatches + self.unknown_types + self.incomplete_frames
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekHeader,
    ReadType,
    ReadPayload(FrameType),
    ReadChecksum(FrameType),
}

/// Decoder for the headered, checksummed profile.
///
/// ```text
/// SeekHeader → ReadType → ReadPayload(n) → ReadChecksum → (emit | reject) → SeekHeader
/// ```
///
/// In `SeekHeader` every byte other than [`HEADER`] is discarded, which is
/// the single recovery mechanism for corruption and mid-stream attach.
///
/// A checksum mismatch means the header was probably noise, so the bytes
/// read after it are scanned again from `SeekHeader`. A real frame that
/// began inside the rejected one is still found.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    payload: [u8; MAX_PAYLOAD],
    filled: usize,
    discarded: usize,
    replay: VecDeque<u8>,
    ready: VecDeque<Result<Frame>>,
    stats: DecodeStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: State::SeekHeader,
            payload: [0u8; MAX_PAYLOAD],
            filled: 0,
            discarded: 0,
            replay: VecDeque::new(),
            ready: VecDeque::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Feed a slice, collecting every completed result in order.
    pub fn push_slice(&mut self, bytes: &[u8]) -> Vec<Result<Frame>> {
        let mut out = Vec::new();
        for byte in bytes {
            out.extend(self.push(*byte));
            while let Some(result) = self.take_ready() {
                out.push(result);
            }
        }
        out
    }

    fn header_found(&mut self) -> Option<Result<Frame>> {
        self.state = State::ReadType;
        if self.discarded == 0 {
            return None;
        }
        let discarded = std::mem::take(&mut self.discarded);
        self.stats.sync_losses += 1;
        debug!(discarded, "resynchronized on frame header");
        Some(Err(FrameError::SyncLost { discarded }))
    }

    fn step(&mut self, byte: u8) -> Option<Result<Frame>> {
        match self.state {
            State::SeekHeader => {
                if byte == HEADER {
                    return self.header_found();
                }
                self.discarded += 1;
                self.stats.bytes_discarded += 1;
                None
            }
            State::ReadType => match FrameType::from_tag(byte) {
                Some(kind) => {
                    self.payload = [0u8; MAX_PAYLOAD];
                    self.filled = 0;
                    self.state = State::ReadPayload(kind);
                    None
                }
                // A repeated header means the previous one was noise.
                None if byte == HEADER => {
                    self.discarded += 1;
                    self.stats.bytes_discarded += 1;
                    self.header_found()
                }
                None => {
                    self.state = State::SeekHeader;
                    self.stats.unknown_types += 1;
                    warn!(type_tag = format_args!("0x{byte:02X}"), "unknown frame type");
                    Some(Err(FrameError::UnknownType(byte)))
                }
            },
            State::ReadPayload(kind) => {
                self.payload[self.filled] = byte;
                self.filled += 1;
                if self.filled == kind.payload_len() {
                    self.state = State::ReadChecksum(kind);
                }
                None
            }
            State::ReadChecksum(kind) => {
                self.state = State::SeekHeader;
                let expected = checksum(HEADER, kind.tag(), &self.payload[..self.filled]);
                if expected != byte {
                    self.stats.checksum_mismatches += 1;
                    // Rescan from the byte after the rejected header, ahead
                    // of anything still queued from an outer rescan.
                    self.replay.push_front(byte);
                    for b in self.payload[..self.filled].iter().rev() {
                        self.replay.push_front(*b);
                    }
                    self.replay.push_front(kind.tag());
                    warn!(
                        type_tag = format_args!("0x{:02X}", kind.tag()),
                        expected = format_args!("0x{expected:02X}"),
                        actual = format_args!("0x{byte:02X}"),
                        "checksum mismatch"
                    );
                    return Some(Err(FrameError::ChecksumMismatch {
                        type_tag: kind.tag(),
                        expected,
                        actual: byte,
                    }));
                }
                self.stats.frames += 1;
                trace!(kind = kind.name(), "frame decoded");
                Some(Ok(Frame::from_validated(kind, self.payload)))
            }
        }
    }
}

impl StreamDecoder for FrameDecoder {
    fn push(&mut self, byte: u8) -> Option<Result<Frame>> {
        let first = self.step(byte);
        while let Some(b) = self.replay.pop_front() {
            if let Some(result) = self.step(b) {
                self.ready.push_back(result);
            }
        }
        match first {
            Some(result) => Some(result),
            None => self.ready.pop_front(),
        }
    }

    fn take_ready(&mut self) -> Option<Result<Frame>> {
        self.ready.pop_front()
    }

    fn abort(&mut self) -> Option<FrameError> {
        let (type_tag, received) = match self.state {
            State::SeekHeader => return None,
            State::ReadType => (None, 1),
            State::ReadPayload(kind) => (Some(kind.tag()), 2 + self.filled),
            State::ReadChecksum(kind) => (Some(kind.tag()), 2 + self.filled),
        };
        self.state = State::SeekHeader;
        self.filled = 0;
        self.stats.incomplete_frames += 1;
        debug!(received, "abandoned incomplete frame");
        Some(FrameError::IncompleteFrame { type_tag, received })
    }

    fn is_idle(&self) -> bool {
        self.state == State::SeekHeader
    }

    fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    fn profile(&self) -> FramingProfile {
        FramingProfile::Headered
    }
}
