//! Sensor telemetry framing over an unstructured byte stream.
//!
//! This is the core of sensorlink. Every inbound frame in the headered
//! profile is laid out as:
//! - A 1-byte header sentinel (`0xAA`) for stream synchronization
//! - A 1-byte type tag selecting the payload kind and width
//! - A 2- or 4-byte payload
//! - A 1-byte additive checksum over everything before it
//!
//! The decoder finds frame boundaries by scanning for the header, so it
//! recovers from dropped or corrupted bytes and from attaching mid-stream.

pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod frame_type;
pub mod prefix;
pub mod reader;
pub mod reading;
pub mod synthetic;
pub mod wire;

#[cfg(feature = "async")]
pub mod async_codec;

pub use checksum::{checksum, validate};
pub use codec::{encode_frame, encode_reading, Frame, FramingProfile, MAX_PAYLOAD};
pub use decoder::{DecodeStats, FrameDecoder, StreamDecoder};
pub use error::{FrameError, Result};
pub use frame_type::{Axis, Domain, FrameType, HEADER};
pub use prefix::{encode_prefixed, PrefixDecoder, PrefixKind};
pub use reader::FrameReader;
pub use reading::{AxisSample, EcgSample, Reading};
pub use synthetic::{SyntheticConfig, SyntheticSource};

#[cfg(feature = "async")]
pub use async_codec::TelemetryCodec;
