//! # pgp-remote-signer
//!
//! Produce OpenPGP (RFC 4880) public keys, subkey bindings and detached signatures for keys
//! whose private half never leaves an external signing authority, such as a hardware device
//! or a gpg-agent style process.
//!
//! The crate only knows how to build the exact byte sequences that get hashed, hand the
//! resulting digest to a [`adapter::SigningCapability`] and assemble the answer into packets.
//!
//! ```no_run
//! use pgp_remote_signer::adapter::{DeviceSigner, DeviceTransport};
//! use pgp_remote_signer::composed::Signer;
//! use pgp_remote_signer::crypto::ecc_curve::ECCCurve;
//! use pgp_remote_signer::types::Timestamp;
//!
//! fn export<T: DeviceTransport>(transport: T) -> pgp_remote_signer::errors::Result<String> {
//!     let device = DeviceSigner::new(transport, "Alice <alice@example.com>", ECCCurve::P256);
//!     let mut signer = Signer::new(
//!         "Alice <alice@example.com>",
//!         Timestamp::from_secs(1_600_000_000),
//!         ECCCurve::P256,
//!         device,
//!     )?;
//!     let armored = signer.export_armored()?;
//!     signer.close()?;
//!     Ok(armored)
//! }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]

#[macro_use]
pub mod errors;

pub mod adapter;
pub mod armor;
pub mod composed;
pub mod crypto;
pub mod packet;
pub mod ser;
pub mod types;

mod line_writer;
mod parsing;

pub use self::armor::armor;
pub use self::composed::{ExistingKey, KeyLoader, Signer, SignerOptions};
pub use self::packet::{packet, subpacket, subpackets, PublicKey, Signature, SignatureConfig};
pub use self::types::{Fingerprint, KeyId, Mpi, Timestamp, VerifyingKey};
