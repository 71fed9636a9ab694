//! Outbound datagram encoding.
//!
//! Every datagram is a label byte followed by the payload:
//!
//! ```text
//! label  payload
//!   0    ECG: [hi][lo], or a packed pair [v1hi][v1lo][v2hi][v2lo]
//!   1    temperature: f32
//!   2    gyroscope: x, y, z as f32
//!   3    accelerometer: x, y, z as f32
//! ```
//!
//! Floats are little-endian.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use sensorlink_frame::wire::{ecg_from_bytes, ecg_to_bytes, ecg_to_packed, f32_from_le};
use sensorlink_frame::{Domain, EcgSample};
use serde::{Deserialize, Serialize};

use crate::error::PacketError;
use crate::sample::{CompositeSample, EcgPair, Telemetry};

/// Datagram kind, the first byte of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Label {
    Ecg = 0,
    Temperature = 1,
    Gyro = 2,
    Accel = 3,
}

impl Label {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Label::Ecg),
            1 => Some(Label::Temperature),
            2 => Some(Label::Gyro),
            3 => Some(Label::Accel),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Accel => Label::Accel,
            Domain::Gyro => Label::Gyro,
        }
    }
}

/// How ECG samples are laid out in outbound datagrams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcgLayout {
    /// One datagram per sample carrying the raw 2-byte word.
    #[default]
    Passthrough,
    /// One datagram per two samples, each packed to 10 bits.
    Paired,
}

impl EcgLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            EcgLayout::Passthrough => "passthrough",
            EcgLayout::Paired => "paired",
        }
    }
}

impl fmt::Display for EcgLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EcgLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(EcgLayout::Passthrough),
            "paired" => Ok(EcgLayout::Paired),
            other => Err(format!(
                "unknown ECG layout {other:?} (expected passthrough or paired)"
            )),
        }
    }
}

/// One encoded datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    label: Label,
    bytes: Bytes,
}

impl OutboundPacket {
    pub fn label(&self) -> Label {
        self.label
    }

    /// Everything after the label byte.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    /// The full datagram, label included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse a received datagram back into telemetry.
    ///
    /// ECG datagrams are told apart by length: 2 payload bytes hold one raw
    /// sample, 4 hold a packed pair.
    pub fn parse(datagram: &[u8]) -> Result<Telemetry, PacketError> {
        let (&label_byte, payload) = datagram.split_first().ok_or(PacketError::Empty)?;
        let label = Label::from_byte(label_byte).ok_or(PacketError::UnknownLabel(label_byte))?;
        let bad_length = || PacketError::BadLength {
            label: label_byte,
            len: payload.len(),
        };

        match label {
            Label::Ecg => match payload.len() {
                2 => ecg_from_bytes(payload).map(Telemetry::Ecg).ok_or_else(bad_length),
                4 => Ok(Telemetry::EcgPair(EcgPair {
                    v1: unpack_ecg(payload[0], payload[1]),
                    v2: unpack_ecg(payload[2], payload[3]),
                })),
                _ => Err(bad_length()),
            },
            Label::Temperature => f32_from_le(payload)
                .map(Telemetry::Temperature)
                .ok_or_else(bad_length),
            Label::Gyro | Label::Accel => {
                if payload.len() != 12 {
                    return Err(bad_length());
                }
                let axis = |i: usize| f32_from_le(&payload[i * 4..i * 4 + 4]).unwrap_or_default();
                let domain = if label == Label::Gyro {
                    Domain::Gyro
                } else {
                    Domain::Accel
                };
                Ok(Telemetry::Composite {
                    domain,
                    sample: CompositeSample::new(axis(0), axis(1), axis(2)),
                })
            }
        }
    }
}

fn unpack_ecg(hi: u8, lo: u8) -> EcgSample {
    EcgSample::from_value(u16::from(hi) << 8 | u16::from(lo))
}

/// Encode telemetry into its outbound datagram.
pub fn encode(telemetry: &Telemetry) -> OutboundPacket {
    let (label, capacity) = match telemetry {
        Telemetry::Ecg(_) => (Label::Ecg, 3),
        Telemetry::EcgPair(_) => (Label::Ecg, 5),
        Telemetry::Temperature(_) => (Label::Temperature, 5),
        Telemetry::Composite { domain, .. } => (Label::for_domain(*domain), 13),
    };

    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_u8(label.byte());
    match telemetry {
        Telemetry::Ecg(sample) => buf.put_slice(&ecg_to_bytes(*sample)),
        Telemetry::EcgPair(pair) => {
            buf.put_slice(&ecg_to_packed(pair.v1));
            buf.put_slice(&ecg_to_packed(pair.v2));
        }
        Telemetry::Temperature(value) => buf.put_f32_le(*value),
        Telemetry::Composite { sample, .. } => {
            for value in sample.to_array() {
                buf.put_f32_le(value);
            }
        }
    }

    OutboundPacket {
        label,
        bytes: buf.freeze(),
    }
}
