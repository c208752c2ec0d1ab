use std::fmt;

use sha1_checked::{CollisionResult, Sha1};

use crate::errors::Result;
use crate::types::KeyId;

/// Represents a v4 Fingerprint, the SHA-1 digest over the hashable form of a key.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-12.2>
#[derive(Clone, Copy, Eq, PartialEq, Hash, derive_more::Debug)]
#[debug("{}", hex::encode(_0))]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    /// Computes the fingerprint of `0x99 ‖ u16 length ‖ key body`.
    pub fn from_hashable(data: &[u8]) -> Result<Self> {
        match Sha1::try_digest(data) {
            CollisionResult::Ok(output) => Ok(Fingerprint(output.into())),
            CollisionResult::Collision(_) | CollisionResult::Mitigated(_) => {
                bail!("SHA1 hash collision detected")
            }
        }
    }

    /// The low 8 bytes.
    pub fn key_id(&self) -> KeyId {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.0[12..]);
        KeyId::from(id)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn sha1_of_empty_input() {
        let fp = Fingerprint::from_hashable(b"").unwrap();
        assert_eq!(
            fp.as_bytes(),
            &hex!("da39a3ee5e6b4b0d3255bfef95601890afd80709")[..]
        );
        assert_eq!(fp.key_id().as_ref(), &hex!("95601890afd80709")[..]);
    }
}
