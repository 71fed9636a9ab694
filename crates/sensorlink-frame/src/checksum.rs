//! Additive 8-bit frame checksum.

/// Sum of header, type and payload bytes, modulo 256.
pub fn checksum(header: u8, type_tag: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(header.wrapping_add(type_tag), |acc, b| acc.wrapping_add(*b))
}

/// True when `expected` matches the checksum of the given frame bytes.
pub fn validate(header: u8, type_tag: u8, payload: &[u8], expected: u8) -> bool {
    checksum(header, type_tag, payload) == expected
}
