//! Prefix-only framing profile.
//!
//! Each sample is a single prefix byte followed by its floats, with no
//! header and no checksum:
//!
//! ```text
//! 0x01 [x f32][y f32][z f32]   accelerometer sample
//! 0x03 [x f32][y f32][z f32]   gyroscope sample
//! 0x04 [f32]                   temperature
//! ```
//!
//! The decoder emits one axis frame per float so downstream aggregation is
//! identical for both profiles.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::codec::{Frame, FramingProfile, MAX_PAYLOAD};
use crate::decoder::{DecodeStats, StreamDecoder};
use crate::error::{FrameError, Result};
use crate::frame_type::{Axis, Domain, FrameType};

/// Sample kinds of the prefix profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixKind {
    AccelSample,
    GyroSample,
    Temperature,
}

impl PrefixKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(PrefixKind::AccelSample),
            0x03 => Some(PrefixKind::GyroSample),
            0x04 => Some(PrefixKind::Temperature),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            PrefixKind::AccelSample => 0x01,
            PrefixKind::GyroSample => 0x03,
            PrefixKind::Temperature => 0x04,
        }
    }

    /// Number of floats following the prefix.
    pub fn value_count(self) -> usize {
        match self {
            PrefixKind::AccelSample | PrefixKind::GyroSample => 3,
            PrefixKind::Temperature => 1,
        }
    }

    fn frame_type(self, index: usize) -> FrameType {
        match self {
            PrefixKind::AccelSample => FrameType::axis(Domain::Accel, Axis::ALL[index]),
            PrefixKind::GyroSample => FrameType::axis(Domain::Gyro, Axis::ALL[index]),
            PrefixKind::Temperature => FrameType::Temperature,
        }
    }
}

/// Encode one prefix-profile sample.
///
/// `values` must hold exactly [`PrefixKind::value_count`] floats; extra
/// values are ignored and missing ones are written as zero.
pub fn encode_prefixed(kind: PrefixKind, values: &[f32], dst: &mut BytesMut) {
    let count = kind.value_count();
    dst.reserve(1 + 4 * count);
    dst.put_u8(kind.byte());
    for i in 0..count {
        dst.put_f32_le(values.get(i).copied().unwrap_or(0.0));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadPrefix,
    ReadValue { kind: PrefixKind, index: usize },
}

/// Decoder for the prefix-only profile.
#[derive(Debug)]
pub struct PrefixDecoder {
    state: State,
    value: [u8; MAX_PAYLOAD],
    filled: usize,
    stats: DecodeStats,
}

impl Default for PrefixDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixDecoder {
    pub fn new() -> Self {
        Self {
            state: State::ReadPrefix,
            value: [0u8; MAX_PAYLOAD],
            filled: 0,
            stats: DecodeStats::default(),
        }
    }

    /// Feed a slice, collecting every completed result in order.
    pub fn push_slice(&mut self, bytes: &[u8]) -> Vec<Result<Frame>> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }
}

impl StreamDecoder for PrefixDecoder {
    fn push(&mut self, byte: u8) -> Option<Result<Frame>> {
        match self.state {
            State::ReadPrefix => match PrefixKind::from_byte(byte) {
                Some(kind) => {
                    self.state = State::ReadValue { kind, index: 0 };
                    self.filled = 0;
                    None
                }
                None => {
                    self.stats.unknown_types += 1;
                    self.stats.bytes_discarded += 1;
                    debug!(prefix = format_args!("0x{byte:02X}"), "unknown sample prefix");
                    Some(Err(FrameError::UnknownType(byte)))
                }
            },
            State::ReadValue { kind, index } => {
                self.value[self.filled] = byte;
                self.filled += 1;
                if self.filled < MAX_PAYLOAD {
                    return None;
                }

                self.filled = 0;
                self.state = if index + 1 < kind.value_count() {
                    State::ReadValue {
                        kind,
                        index: index + 1,
                    }
                } else {
                    State::ReadPrefix
                };

                let frame_type = kind.frame_type(index);
                self.stats.frames += 1;
                trace!(kind = frame_type.name(), "prefixed value decoded");
                Some(Ok(Frame::from_validated(frame_type, self.value)))
            }
        }
    }

    fn abort(&mut self) -> Option<FrameError> {
        let State::ReadValue { kind, index } = self.state else {
            return None;
        };
        let received = 1 + index * MAX_PAYLOAD + self.filled;
        self.state = State::ReadPrefix;
        self.filled = 0;
        self.stats.incomplete_frames += 1;
        debug!(received, "abandoned incomplete prefixed sample");
        Some(FrameError::IncompleteFrame {
            type_tag: Some(kind.byte()),
            received,
        })
    }

    fn is_idle(&self) -> bool {
        self.state == State::ReadPrefix
    }

    fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    fn profile(&self) -> FramingProfile {
        FramingProfile::Prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;

    #[test]
    fn accel_sample_emits_three_axis_frames_in_order() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::AccelSample, &[1.0, -2.0, 0.5], &mut wire);

        let out: Vec<Reading> = PrefixDecoder::new()
            .push_slice(&wire)
            .into_iter()
            .map(|r| r.unwrap().reading())
            .collect();

        assert_eq!(
            out,
            vec![
                Reading::axis(Domain::Accel, Axis::X, 1.0),
                Reading::axis(Domain::Accel, Axis::Y, -2.0),
                Reading::axis(Domain::Accel, Axis::Z, 0.5),
            ]
        );
    }

    #[test]
    fn temperature_and_gyro_interleave() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::Temperature, &[30.5], &mut wire);
        encode_prefixed(PrefixKind::GyroSample, &[10.0, 20.0, 30.0], &mut wire);

        let mut decoder = PrefixDecoder::new();
        let out = decoder.push_slice(&wire);

        assert_eq!(out.len(), 4);
        assert_eq!(out[0].as_ref().unwrap().reading(), Reading::Temperature(30.5));
        assert_eq!(
            out[3].as_ref().unwrap().reading(),
            Reading::axis(Domain::Gyro, Axis::Z, 30.0)
        );
        assert_eq!(decoder.stats().frames, 4);
        assert!(decoder.is_idle());
    }

    #[test]
    fn emitted_frames_carry_canonical_checksum() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::Temperature, &[10.0], &mut wire);

        let frame = PrefixDecoder::new().push_slice(&wire).remove(0).unwrap();
        assert_eq!(frame.checksum(), 0x3C);
    }

    #[test]
    fn unknown_prefix_is_reported_and_skipped() {
        let mut wire = BytesMut::from(&[0x02, 0xAA][..]);
        encode_prefixed(PrefixKind::Temperature, &[1.0], &mut wire);

        let mut decoder = PrefixDecoder::new();
        let out = decoder.push_slice(&wire);

        assert!(matches!(out[0], Err(FrameError::UnknownType(0x02))));
        assert!(matches!(out[1], Err(FrameError::UnknownType(0xAA))));
        assert_eq!(out[2].as_ref().unwrap().reading(), Reading::Temperature(1.0));
        assert_eq!(decoder.stats().unknown_types, 2);
    }

    #[test]
    fn abort_mid_sample() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::GyroSample, &[1.0, 2.0, 3.0], &mut wire);
        wire.truncate(1 + 4 + 2);

        let mut decoder = PrefixDecoder::new();
        let out = decoder.push_slice(&wire);
        assert_eq!(out.len(), 1);

        let err = decoder.abort().unwrap();
        assert!(matches!(
            err,
            FrameError::IncompleteFrame {
                type_tag: Some(0x03),
                received: 7
            }
        ));
        assert!(decoder.is_idle());
    }

    #[test]
    fn encode_pads_missing_values() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::AccelSample, &[1.0], &mut wire);
        assert_eq!(wire.len(), 13);
        assert_eq!(&wire[5..], &[0u8; 8]);
    }
}
