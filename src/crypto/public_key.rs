use num_enum::{FromPrimitive, IntoPrimitive};

/// Public key algorithms.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-9.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive, derive_more::Display)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    #[display("RSA")]
    RSA = 1,
    /// DSA (Digital Signature Algorithm)
    #[display("DSA")]
    DSA = 17,
    /// Elliptic Curve: RFC-6637
    #[display("ECDH")]
    ECDH = 18,
    /// ECDSA: RFC-6637
    #[display("ECDSA")]
    ECDSA = 19,
    /// EdDSA legacy format, as used by GnuPG for Ed25519 keys
    #[display("EdDSA")]
    EdDSALegacy = 22,

    #[num_enum(catch_all)]
    #[display("Unknown({_0})")]
    Unknown(u8),
}

impl PublicKeyAlgorithm {
    /// Number of MPIs in a signature value made with this algorithm, `None` if it cannot sign.
    pub fn signature_mpi_count(self) -> Option<usize> {
        match self {
            PublicKeyAlgorithm::RSA => Some(1),
            PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::ECDSA | PublicKeyAlgorithm::EdDSALegacy => {
                Some(2)
            }
            PublicKeyAlgorithm::ECDH | PublicKeyAlgorithm::Unknown(_) => None,
        }
    }
}
