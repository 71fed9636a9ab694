//! Numeric payload conversions, independent of framing.
//!
//! Floats are IEEE-754 single precision, little-endian. ECG samples are a
//! 16-bit word with the high byte first.

use bytes::{BufMut, BytesMut};

use crate::reading::EcgSample;

/// Decode a little-endian `f32`. Returns `None` unless exactly 4 bytes are given.
pub fn f32_from_le(bytes: &[u8]) -> Option<f32> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(f32::from_le_bytes(raw))
}

/// Encode an `f32` as 4 little-endian bytes.
pub fn f32_to_le(value: f32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Append an `f32` in little-endian order.
pub fn put_f32_le(dst: &mut BytesMut, value: f32) {
    dst.put_f32_le(value);
}

/// Decode an ECG sample from its 2-byte wire form (high byte first).
pub fn ecg_from_bytes(bytes: &[u8]) -> Option<EcgSample> {
    let raw: [u8; 2] = bytes.try_into().ok()?;
    Some(EcgSample::from_raw(u16::from_be_bytes(raw)))
}

/// Encode an ECG sample's raw word, high byte first.
pub fn ecg_to_bytes(sample: EcgSample) -> [u8; 2] {
    sample.raw().to_be_bytes()
}

/// Pack a sample's 10-bit value as `[high 2 bits, low 8 bits]`.
pub fn ecg_to_packed(sample: EcgSample) -> [u8; 2] {
    let value = sample.value();
    [((value >> 8) & 0x03) as u8, (value & 0xFF) as u8]
}
