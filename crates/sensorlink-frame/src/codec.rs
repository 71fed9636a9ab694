use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::checksum::checksum;
use crate::decoder::{FrameDecoder, StreamDecoder};
use crate::error::{FrameError, Result};
use crate::frame_type::{Domain, FrameType, HEADER};
use crate::prefix::PrefixDecoder;
use crate::reading::{AxisSample, Reading};
use crate::wire;

/// Widest payload of any frame type.
pub const MAX_PAYLOAD: usize = 4;

/// Header + type + checksum bytes around every payload.
pub const FRAME_OVERHEAD: usize = 3;

/// A checksum-valid frame.
///
/// Invariant: `checksum == (HEADER + tag + sum(payload)) mod 256`. Every
/// constructor upholds it, so a `Frame` value is always forwardable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    kind: FrameType,
    payload: [u8; MAX_PAYLOAD],
    checksum: u8,
}

impl Frame {
    /// Build a frame, computing its checksum.
    ///
    /// Fails if `payload` is not exactly the width `kind` requires.
    pub fn new(kind: FrameType, payload: &[u8]) -> Result<Self> {
        let expected = kind.payload_len();
        if payload.len() != expected {
            return Err(FrameError::PayloadLength {
                type_tag: kind.tag(),
                expected,
                actual: payload.len(),
            });
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..expected].copy_from_slice(payload);
        Ok(Self::from_validated(kind, buf))
    }

    /// Build a frame from a payload buffer already sized for `kind`.
    pub(crate) fn from_validated(kind: FrameType, payload: [u8; MAX_PAYLOAD]) -> Self {
        let sum = checksum(HEADER, kind.tag(), &payload[..kind.payload_len()]);
        Self {
            kind,
            payload,
            checksum: sum,
        }
    }

    /// The frame that carries `reading` on the wire.
    pub fn from_reading(reading: &Reading) -> Self {
        let mut payload = [0u8; MAX_PAYLOAD];
        match reading {
            Reading::Ecg(sample) => payload[..2].copy_from_slice(&wire::ecg_to_bytes(*sample)),
            Reading::Temperature(value) => payload = wire::f32_to_le(*value),
            Reading::Axis(sample) => payload = wire::f32_to_le(sample.value),
        }
        Self::from_validated(reading.frame_type(), payload)
    }

    /// Decode the typed value carried by this frame.
    pub fn reading(&self) -> Reading {
        let p = self.payload;
        let float = f32::from_le_bytes(p);
        match self.kind {
            FrameType::Ecg => Reading::Ecg(crate::reading::EcgSample::from_raw(
                u16::from_be_bytes([p[0], p[1]]),
            )),
            FrameType::Temperature => Reading::Temperature(float),
            FrameType::AccelAxis(axis) => Reading::Axis(AxisSample {
                domain: Domain::Accel,
                axis,
                value: float,
            }),
            FrameType::GyroAxis(axis) => Reading::Axis(AxisSample {
                domain: Domain::Gyro,
                axis,
                value: float,
            }),
        }
    }

    pub fn kind(&self) -> FrameType {
        self.kind
    }

    /// Payload bytes, exactly `kind().payload_len()` long.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.kind.payload_len()]
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// The total wire size of this frame in the headered profile.
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.kind.payload_len()
    }
}

/// Encode a frame into the headered wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬──────────────────┬──────────┐
/// │ Header   │ Type     │ Payload          │ Checksum │
/// │ 0xAA     │ (1B)     │ (2B ECG, 4B f32) │ (1B sum) │
/// └──────────┴──────────┴──────────────────┴──────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(frame.wire_size());
    dst.put_u8(HEADER);
    dst.put_u8(frame.kind.tag());
    dst.put_slice(frame.payload());
    dst.put_u8(frame.checksum);
}

/// Encode a reading as one headered frame.
pub fn encode_reading(reading: &Reading, dst: &mut BytesMut) {
    encode_frame(&Frame::from_reading(reading), dst);
}

/// Inbound framing style, selected by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingProfile {
    /// `[0xAA][type][payload][checksum]` frames, one axis per frame.
    #[default]
    Headered,
    /// `[prefix][f32…]` samples with no header or checksum.
    Prefix,
}

impl FramingProfile {
    /// A fresh decoder for this profile, positioned at stream start.
    pub fn decoder(self) -> Box<dyn StreamDecoder> {
        match self {
            FramingProfile::Headered => Box::new(FrameDecoder::new()),
            FramingProfile::Prefix => Box::new(PrefixDecoder::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FramingProfile::Headered => "headered",
            FramingProfile::Prefix => "prefix",
        }
    }
}

impl fmt::Display for FramingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FramingProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headered" => Ok(FramingProfile::Headered),
            "prefix" => Ok(FramingProfile::Prefix),
            other => Err(format!(
                "unknown framing profile {other:?} (expected headered or prefix)"
            )),
        }
    }
}
