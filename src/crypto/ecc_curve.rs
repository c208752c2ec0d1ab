use elliptic_curve::sec1::ToEncodedPoint;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{Error, Result};
use crate::types::{Mpi, VerifyingKey};

/// Curves a signing authority may hold keys on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum ECCCurve {
    /// NIST P-256, used with ECDSA
    #[display("nist256p1")]
    P256,
    /// Ed25519, used with legacy EdDSA
    #[display("ed25519")]
    Ed25519,
}

/// Everything needed to put a key on a given curve into a public key packet.
#[derive(Debug)]
pub struct CurveDescriptor {
    pub curve: ECCCurve,
    /// Name used by signing devices.
    pub name: &'static str,
    /// DER encoded OID, without tag and length.
    pub oid: &'static [u8],
    pub algorithm: PublicKeyAlgorithm,
    /// Serializes the public point into the single MPI stored in the key packet.
    pub serialize: fn(&VerifyingKey) -> Result<Mpi>,
}

/// The supported curves. Immutable for the lifetime of the process.
static SUPPORTED_CURVES: [CurveDescriptor; 2] = [
    CurveDescriptor {
        curve: ECCCurve::P256,
        name: "nist256p1",
        // https://tools.ietf.org/html/rfc6637#section-11
        oid: &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
        algorithm: PublicKeyAlgorithm::ECDSA,
        serialize: serialize_p256,
    },
    CurveDescriptor {
        curve: ECCCurve::Ed25519,
        name: "ed25519",
        oid: &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
        algorithm: PublicKeyAlgorithm::EdDSALegacy,
        serialize: serialize_ed25519,
    },
];

/// `0x04 ‖ X ‖ Y`, both coordinates 256 bits.
fn serialize_p256(key: &VerifyingKey) -> Result<Mpi> {
    match key {
        VerifyingKey::P256(key) => {
            let point = key.to_encoded_point(false);
            Ok(Mpi::from_slice(point.as_bytes()))
        }
        _ => bail!("expected a nist256p1 key, got {}", key.curve()),
    }
}

/// `0x40 ‖ encoded point`
fn serialize_ed25519(key: &VerifyingKey) -> Result<Mpi> {
    match key {
        VerifyingKey::Ed25519(key) => {
            let mut mpi = Vec::with_capacity(33);
            mpi.push(0x40);
            mpi.extend_from_slice(key.as_bytes());
            Ok(Mpi::from_slice(&mpi))
        }
        _ => bail!("expected an ed25519 key, got {}", key.curve()),
    }
}

impl ECCCurve {
    /// The registry entry for this curve.
    pub fn descriptor(&self) -> &'static CurveDescriptor {
        match self {
            ECCCurve::P256 => &SUPPORTED_CURVES[0],
            ECCCurve::Ed25519 => &SUPPORTED_CURVES[1],
        }
    }

    /// Standard name
    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn oid(&self) -> &'static [u8] {
        self.descriptor().oid
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.descriptor().algorithm
    }

    /// Serializes `key` as the public point MPI for this curve.
    pub fn serialize(&self, key: &VerifyingKey) -> Result<Mpi> {
        (self.descriptor().serialize)(key)
    }

    /// Looks up a curve by its device name.
    pub fn from_name(name: &str) -> Result<Self> {
        SUPPORTED_CURVES
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.curve)
            .ok_or_else(|| Error::UnsupportedCurve {
                curve: name.to_string(),
            })
    }

    /// Looks up the curve implied by a public key algorithm id of an existing key.
    pub fn from_algorithm(algorithm: PublicKeyAlgorithm) -> Result<Self> {
        SUPPORTED_CURVES
            .iter()
            .find(|d| d.algorithm == algorithm)
            .map(|d| d.curve)
            .ok_or_else(|| Error::UnsupportedCurve {
                curve: format!("algorithm {algorithm}"),
            })
    }

    /// Get the right curve given an oid.
    pub fn from_oid(oid: &[u8]) -> Option<Self> {
        SUPPORTED_CURVES
            .iter()
            .find(|d| d.oid == oid)
            .map(|d| d.curve)
    }
}

impl std::str::FromStr for ECCCurve {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}
