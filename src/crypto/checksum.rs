use std::hash::Hasher;

use crc24::Crc24Hasher;

/// OpenPGP CRC-24 (generator `0x1864CFB`, initialized with `0xB704CE`).
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-6.1>
#[inline]
pub fn crc24(data: &[u8]) -> u32 {
    crc24::hash_raw(data)
}

/// Big-endian 3 octet encoding of a CRC-24 value, as it appears in armor trailers.
#[inline]
pub fn crc24_bytes(crc: u32) -> [u8; 3] {
    [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8]
}

/// Finishes a streaming [`Crc24Hasher`] into the 24 bit checksum.
#[inline]
pub fn finish_crc24(hasher: &Crc24Hasher) -> u32 {
    (hasher.finish() & 0x00FF_FFFF) as u32
}
