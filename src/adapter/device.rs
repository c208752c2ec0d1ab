use log::debug;

use crate::adapter::{AuthorityError, MalformedSnafu, SigningCapability};
use crate::crypto::ecc_curve::ECCCurve;
use crate::ser::Serialize;
use crate::types::{Mpi, VerifyingKey};

/// Length of a signature returned by the device: a marker octet followed by `r ‖ s`.
const DEVICE_SIGNATURE_LEN: usize = 65;

/// Identity a device derives the key from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub proto: String,
    pub host: String,
}

impl DeviceIdentity {
    /// The identity used for OpenPGP keys of `user_id`.
    pub fn gpg(user_id: &str) -> Self {
        DeviceIdentity {
            proto: "gpg".to_string(),
            host: user_id.to_string(),
        }
    }
}

/// Requests a hardware signing device understands.
///
/// Implementations own the actual connection; address derivation from the identity is their
/// concern as well.
pub trait DeviceTransport {
    /// Returns the raw public node for `identity` on `curve`.
    ///
    /// P-256 nodes are SEC1 points, Ed25519 nodes are `0x00 ‖ point`.
    fn get_public_node(
        &mut self,
        identity: &DeviceIdentity,
        curve: ECCCurve,
    ) -> Result<Vec<u8>, AuthorityError>;

    /// Asks the device to sign `challenge_hidden`, showing `challenge_visual` to the user.
    fn sign_identity(
        &mut self,
        identity: &DeviceIdentity,
        challenge_hidden: &[u8],
        challenge_visual: &str,
        curve: ECCCurve,
    ) -> Result<Vec<u8>, AuthorityError>;

    fn clear_session(&mut self) -> Result<(), AuthorityError>;

    fn close(&mut self) -> Result<(), AuthorityError>;
}

/// A [`SigningCapability`] backed by a hardware device.
#[derive(derive_more::Debug)]
#[debug("DeviceSigner({identity:?}, {curve})")]
pub struct DeviceSigner<T: DeviceTransport> {
    transport: T,
    identity: DeviceIdentity,
    curve: ECCCurve,
}

impl<T: DeviceTransport> DeviceSigner<T> {
    pub fn new(transport: T, user_id: &str, curve: ECCCurve) -> Self {
        DeviceSigner {
            transport,
            identity: DeviceIdentity::gpg(user_id),
            curve,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn curve(&self) -> ECCCurve {
        self.curve
    }
}

impl<T: DeviceTransport> SigningCapability for DeviceSigner<T> {
    fn verifying_key(&mut self) -> Result<VerifyingKey, AuthorityError> {
        let node = self
            .transport
            .get_public_node(&self.identity, self.curve)?;

        VerifyingKey::from_device_bytes(self.curve, &node).map_err(|err| {
            AuthorityError::Malformed {
                reason: format!("public node: {err}"),
            }
        })
    }

    fn sign(&mut self, digest: &[u8]) -> Result<Vec<u8>, AuthorityError> {
        let visual = hex::encode_upper(digest);
        let sig = self
            .transport
            .sign_identity(&self.identity, digest, &visual, self.curve)?;
        debug!("device returned {} signature bytes", sig.len());

        if sig.len() != DEVICE_SIGNATURE_LEN {
            return MalformedSnafu {
                reason: format!(
                    "expected {} signature bytes, got {}",
                    DEVICE_SIGNATURE_LEN,
                    sig.len()
                ),
            }
            .fail();
        }
        if sig[0] != 0x00 {
            return MalformedSnafu {
                reason: format!("unexpected signature marker {:#04x}", sig[0]),
            }
            .fail();
        }

        let r = Mpi::from_slice(&sig[1..33]);
        let s = Mpi::from_slice(&sig[33..]);
        vec![r, s].to_bytes().map_err(|err| AuthorityError::Malformed {
            reason: err.to_string(),
        })
    }

    fn release(&mut self) -> Result<(), AuthorityError> {
        // close even if clearing the session failed
        let cleared = self.transport.clear_session();
        let closed = self.transport.close();
        cleared.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use elliptic_curve::sec1::ToEncodedPoint;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        node: Vec<u8>,
        answer: Vec<u8>,
        requests: Vec<(DeviceIdentity, Vec<u8>, String)>,
        calls: Vec<&'static str>,
    }

    impl DeviceTransport for Recorder {
        fn get_public_node(
            &mut self,
            _identity: &DeviceIdentity,
            _curve: ECCCurve,
        ) -> Result<Vec<u8>, AuthorityError> {
            Ok(self.node.clone())
        }

        fn sign_identity(
            &mut self,
            identity: &DeviceIdentity,
            challenge_hidden: &[u8],
            challenge_visual: &str,
            _curve: ECCCurve,
        ) -> Result<Vec<u8>, AuthorityError> {
            self.requests.push((
                identity.clone(),
                challenge_hidden.to_vec(),
                challenge_visual.to_string(),
            ));
            Ok(self.answer.clone())
        }

        fn clear_session(&mut self) -> Result<(), AuthorityError> {
            self.calls.push("clear_session");
            Err(AuthorityError::Refused {
                message: "busy".into(),
            })
        }

        fn close(&mut self) -> Result<(), AuthorityError> {
            self.calls.push("close");
            Ok(())
        }
    }

    #[test]
    fn test_verifying_key_p256() {
        let key = p256::SecretKey::from_slice(&[0x05; 32]).unwrap().public_key();
        let mut signer = DeviceSigner::new(
            Recorder {
                node: key.to_encoded_point(true).as_bytes().to_vec(),
                ..Default::default()
            },
            "Alice",
            ECCCurve::P256,
        );
        assert_eq!(signer.verifying_key().unwrap(), VerifyingKey::P256(key));
        assert_eq!(signer.identity(), &DeviceIdentity::gpg("Alice"));
    }

    #[test]
    fn test_verifying_key_garbage() {
        let mut signer = DeviceSigner::new(
            Recorder {
                node: vec![0x01; 33],
                ..Default::default()
            },
            "Alice",
            ECCCurve::Ed25519,
        );
        assert!(matches!(
            signer.verifying_key(),
            Err(AuthorityError::Malformed { .. })
        ));
    }

    #[test]
    fn test_sign_encodes_two_mpis() {
        let mut answer = vec![0x00];
        answer.extend_from_slice(&[0x00; 31]);
        answer.push(0x05);
        answer.extend_from_slice(&[0xFF; 32]);

        let mut signer = DeviceSigner::new(
            Recorder {
                answer,
                ..Default::default()
            },
            "Alice",
            ECCCurve::P256,
        );
        let out = signer.sign(&[0xAB; 32]).unwrap();

        let mut expected = vec![0x00, 0x03, 0x05, 0x01, 0x00];
        expected.extend_from_slice(&[0xFF; 32]);
        assert_eq!(out, expected);

        let (identity, hidden, visual) = &signer.transport.requests[0];
        assert_eq!(identity.proto, "gpg");
        assert_eq!(identity.host, "Alice");
        assert_eq!(hidden, &vec![0xAB; 32]);
        assert_eq!(visual, &"AB".repeat(32));
    }

    #[test]
    fn test_sign_rejects_bad_marker_and_length() {
        let mut signer = DeviceSigner::new(
            Recorder {
                answer: vec![0x01; 65],
                ..Default::default()
            },
            "Alice",
            ECCCurve::Ed25519,
        );
        assert!(matches!(
            signer.sign(&[0; 32]),
            Err(AuthorityError::Malformed { .. })
        ));

        signer.transport.answer = vec![0x00; 64];
        assert!(matches!(
            signer.sign(&[0; 32]),
            Err(AuthorityError::Malformed { .. })
        ));
    }

    #[test]
    fn test_release_always_closes() {
        let mut signer = DeviceSigner::new(Recorder::default(), "Alice", ECCCurve::P256);
        assert!(signer.release().is_err());
        assert_eq!(signer.transport.calls, vec!["clear_session", "close"]);
    }
}
