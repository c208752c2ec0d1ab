use num_bigint::BigUint;

use crate::adapter::{AuthorityError, MalformedSnafu, SigningCapability};
use crate::ser::Serialize;
use crate::types::{Mpi, VerifyingKey};

/// A connection to a gpg-agent style key holder.
pub trait AgentConnection {
    /// Looks up the keygrip of the key belonging to `user_id`.
    fn get_keygrip(&mut self, user_id: &str) -> Result<String, AuthorityError>;

    /// Signs `digest` with the key named by `keygrip`, returning the raw integer parameters.
    fn sign(&mut self, keygrip: &str, digest: &[u8]) -> Result<Vec<BigUint>, AuthorityError>;

    fn close(&mut self) -> Result<(), AuthorityError>;
}

/// A [`SigningCapability`] backed by an agent process holding an existing key.
///
/// The agent does not hand out public keys, so the verifying key comes from the keyring
/// entry of the key it signs with.
#[derive(derive_more::Debug)]
#[debug("AgentSigner({keygrip})")]
pub struct AgentSigner<C: AgentConnection> {
    conn: C,
    keygrip: String,
    key: VerifyingKey,
}

impl<C: AgentConnection> AgentSigner<C> {
    pub fn new(mut conn: C, user_id: &str, key: VerifyingKey) -> Result<Self, AuthorityError> {
        let keygrip = conn.get_keygrip(user_id)?;
        Ok(AgentSigner { conn, keygrip, key })
    }

    pub fn keygrip(&self) -> &str {
        &self.keygrip
    }
}

impl<C: AgentConnection> SigningCapability for AgentSigner<C> {
    fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError> {
        Ok(self.key.clone())
    }

    fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError> {
        let params = self.conn.sign(&self.keygrip, digest)?;
        if params.len() != 2 {
            return MalformedSnafu {
                reason: format!("expected 2 signature parameters, got {}", params.len()),
            }
            .fail();
        }

        let mpis: Vec<Mpi> = params.iter().map(Mpi::from).collect();
        mpis.to_bytes().map_err(|err| AuthorityError::Malformed {
            reason: err.to_string(),
        })
    }

    fn release(&mut self) -> Result<(), AuthorityError> {
        self.conn.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        params: Vec<BigUint>,
        closed: bool,
    }

    impl AgentConnection for Scripted {
        fn get_keygrip(&mut self, user_id: &str) -> Result<String, AuthorityError> {
            if user_id == "nobody" {
                return Err(AuthorityError::Refused {
                    message: "no such key".into(),
                });
            }
            Ok("ABCDEF0123".to_string())
        }

        fn sign(&mut self, keygrip: &str, _digest: &[u8]) -> Result<Vec<BigUint>, AuthorityError> {
            assert_eq!(keygrip, "ABCDEF0123");
            Ok(self.params.clone())
        }

        fn close(&mut self) -> Result<(), AuthorityError> {
            self.closed = true;
            Ok(())
        }
    }

    fn key() -> VerifyingKey {
        ed25519_dalek::SigningKey::from_bytes(&[0x07; 32])
            .verifying_key()
            .into()
    }

    #[test]
    fn test_sign_concatenates_params() {
        let conn = Scripted {
            params: vec![BigUint::from(0x0102u16), BigUint::from(1u8)],
            closed: false,
        };
        let mut signer = AgentSigner::new(conn, "Alice", key()).unwrap();
        assert_eq!(signer.keygrip(), "ABCDEF0123");
        assert_eq!(signer.verifying_key().unwrap(), key());
        assert_eq!(
            signer.sign(&[0; 32]).unwrap(),
            vec![0x00, 0x09, 0x01, 0x02, 0x00, 0x01, 0x01]
        );

        signer.release().unwrap();
        assert!(signer.conn.closed);
    }

    #[test]
    fn test_wrong_param_count() {
        let conn = Scripted {
            params: vec![BigUint::from(1u8)],
            closed: false,
        };
        let mut signer = AgentSigner::new(conn, "Alice", key()).unwrap();
        assert!(matches!(
            signer.sign(&[0; 32]),
            Err(AuthorityError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unknown_user() {
        let conn = Scripted {
            params: vec![],
            closed: false,
        };
        assert!(matches!(
            AgentSigner::new(conn, "nobody", key()),
            Err(AuthorityError::Refused { .. })
        ));
    }
}
