use num_enum::{FromPrimitive, IntoPrimitive};

/// Packet Tag, see <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.3>
///
/// Only the tags this crate emits are named, everything else is carried as `Other`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum Tag {
    /// Signature Packet
    Signature = 2,
    /// Public-Key Packet
    PublicKey = 6,
    /// User ID Packet
    UserId = 13,
    /// Public-Subkey Packet
    PublicSubkey = 14,

    #[num_enum(catch_all)]
    Other(#[cfg_attr(test, proptest(strategy = "0u8..=63"))] u8),
}

/// Available compression algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    Uncompressed = 0,
    ZIP = 1,
    ZLIB = 2,
    BZip2 = 3,
    #[num_enum(catch_all)]
    Other(u8),
}
