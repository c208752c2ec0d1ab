//! # Cryptography module
//!
//! Algorithm identifiers, the supported curve table and the checksums used by the encoders.
//! No private key operation lives here, those are delegated to a
//! [`SigningCapability`](crate::adapter::SigningCapability).

pub mod checksum;
pub mod ecc_curve;
pub mod hash;
pub mod public_key;
