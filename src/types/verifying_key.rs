use elliptic_curve::sec1::ToEncodedPoint;

use crate::crypto::ecc_curve::ECCCurve;
use crate::errors::Result;
use crate::types::Mpi;

/// Public key material as handed out by a signing authority.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VerifyingKey {
    /// NIST P-256 point
    P256(p256::PublicKey),
    /// Ed25519 point
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl VerifyingKey {
    /// The curve this key lives on.
    pub fn curve(&self) -> ECCCurve {
        match self {
            Self::P256(_) => ECCCurve::P256,
            Self::Ed25519(_) => ECCCurve::Ed25519,
        }
    }

    /// Decodes the public node bytes reported by a hardware device.
    ///
    /// P-256 keys arrive as SEC1 points (usually compressed, 33 bytes),
    /// Ed25519 keys as a `0x00` marker followed by the 32 byte point.
    pub fn from_device_bytes(curve: ECCCurve, raw: &[u8]) -> Result<Self> {
        match curve {
            ECCCurve::P256 => {
                let key = p256::PublicKey::from_sec1_bytes(raw)?;
                Ok(Self::P256(key))
            }
            ECCCurve::Ed25519 => {
                ensure_eq!(raw.len(), 33, "invalid ed25519 public node (len)");
                ensure_eq!(raw[0], 0x00, "invalid ed25519 public node (prefix)");
                let key = ed25519_dalek::VerifyingKey::try_from(&raw[1..])?;
                Ok(Self::Ed25519(key))
            }
        }
    }

    /// Decodes the point MPI stored in a public key packet.
    pub fn from_mpi(curve: ECCCurve, mpi: &Mpi) -> Result<Self> {
        let raw = mpi.as_ref();
        match curve {
            ECCCurve::P256 => {
                ensure_eq!(raw.len(), 65, "invalid Q (len)");
                ensure_eq!(raw[0], 0x04, "invalid Q (prefix)");
                let key = p256::PublicKey::from_sec1_bytes(raw)?;
                Ok(Self::P256(key))
            }
            ECCCurve::Ed25519 => {
                ensure_eq!(raw.len(), 33, "invalid Q (len)");
                ensure_eq!(raw[0], 0x40, "invalid Q (prefix)");
                let key = ed25519_dalek::VerifyingKey::try_from(&raw[1..])?;
                Ok(Self::Ed25519(key))
            }
        }
    }

    /// SEC1 uncompressed encoding for P-256, raw point bytes for Ed25519.
    pub fn to_raw_bytes(&self) -> Vec<u8> {
        match self {
            Self::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            Self::Ed25519(key) => key.as_bytes().to_vec(),
        }
    }
}

impl From<p256::PublicKey> for VerifyingKey {
    fn from(key: p256::PublicKey) -> Self {
        Self::P256(key)
    }
}

impl From<p256::ecdsa::VerifyingKey> for VerifyingKey {
    fn from(key: p256::ecdsa::VerifyingKey) -> Self {
        Self::P256(key.into())
    }
}

impl From<ed25519_dalek::VerifyingKey> for VerifyingKey {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self::Ed25519(key)
    }
}
