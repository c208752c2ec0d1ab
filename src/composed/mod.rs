//! # Composed module
//!
//! Artifacts built from several packets: exported public keys, subkey bindings and detached
//! message signatures.

mod existing_key;
mod signer;

pub use self::existing_key::{ExistingKey, KeyLoader};
pub use self::signer::{Signer, SignerOptions, SignerOptionsBuilder};
