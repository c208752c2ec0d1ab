use log::debug;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{IntegritySnafu, KeyMismatch, Result};
use crate::packet::PublicKey;
use crate::types::{KeyId, Timestamp};

/// A key that already lives on a keyring, as reported by a [`KeyLoader`].
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
#[debug("ExistingKey({key_id}, {algo:?}, {created:?})")]
pub struct ExistingKey {
    pub created: Timestamp,
    pub algo: PublicKeyAlgorithm,
    pub key_id: KeyId,
    /// `0x99 ‖ u16 length ‖ body`, exactly as it was hashed for the key's certification.
    pub hashable: Vec<u8>,
}

impl ExistingKey {
    /// Rebuilds the public key from its hashable bytes and checks it against the
    /// recorded key id, creation time and algorithm.
    pub fn verify(&self) -> Result<PublicKey> {
        let key = PublicKey::from_hashable_bytes(&self.hashable)?;

        let mismatch = if key.key_id() != self.key_id {
            Some(KeyMismatch::KeyId {
                actual: key.key_id(),
            })
        } else if key.created() != self.created {
            Some(KeyMismatch::Created {
                recorded: self.created,
                actual: key.created(),
            })
        } else if key.algorithm() != self.algo {
            Some(KeyMismatch::Algorithm {
                recorded: self.algo,
                actual: key.algorithm(),
            })
        } else {
            None
        };
        if let Some(mismatch) = mismatch {
            return IntegritySnafu {
                expected: self.key_id,
                mismatch,
            }
            .fail();
        }

        debug!("verified existing key {}", self.key_id);
        Ok(key)
    }

    /// Alias of [`ExistingKey::verify`], the public key is only handed out once verified.
    pub fn public_key(&self) -> Result<PublicKey> {
        self.verify()
    }
}

/// Looks up keys already present on a keyring.
pub trait KeyLoader {
    fn load(&mut self, user_id: &str) -> Result<ExistingKey>;
}
