use std::io;

use bitfield::bitfield;
use bytes::Buf;
use num_enum::{FromPrimitive, IntoPrimitive};
use smallvec::{smallvec, SmallVec};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::header::PacketTrait;
use crate::packet::signature::subpacket::write_subpackets;
use crate::packet::signature::SignatureConfig;
use crate::ser::Serialize;
use crate::types::{KeyId, Mpi, Tag, Timestamp};

/// The only signature version this crate writes.
pub const SIGNATURE_VERSION: u8 = 4;

/// Signature Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.2>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Signature {
    pub config: SignatureConfig,
    #[debug("{}", hex::encode(signed_hash_value))]
    pub signed_hash_value: [u8; 2],
    /// Algorithm specific signature values, `r` and `s` for both supported curves.
    pub signature: Vec<Mpi>,
}

impl Signature {
    pub fn from_config(
        config: SignatureConfig,
        signed_hash_value: [u8; 2],
        signature: Vec<Mpi>,
    ) -> Self {
        Signature {
            config,
            signed_hash_value,
            signature,
        }
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.config.typ()
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.config.created()
    }

    pub fn issuer(&self) -> Option<&KeyId> {
        self.config.issuer()
    }
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.config.header().to_writer(writer)?;
        write_subpackets(&self.config.hashed_subpackets, writer)?;
        write_subpackets(&self.config.unhashed_subpackets, writer)?;

        // signed hash value
        writer.write_all(&self.signed_hash_value)?;

        // the actual signature
        self.signature.to_writer(writer)
    }

    fn write_len(&self) -> usize {
        4 + 2
            + self.config.hashed_subpackets.write_len()
            + 2
            + self.config.unhashed_subpackets.write_len()
            + 2
            + self.signature.write_len()
    }
}

impl PacketTrait for Signature {
    fn tag(&self) -> Tag {
        Tag::Signature
    }
}

/// The fixed leading octets of a v4 signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,
    pub hash_alg: HashAlgorithm,
}

impl Serialize for SignatureHeader {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            // version
            SIGNATURE_VERSION,
            // type
            self.typ.into(),
            // public algorithm
            self.pub_alg.into(),
            // hash algorithm
            self.hash_alg.into(),
        ])?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        4
    }
}

/// Splits a buffer of concatenated MPIs.
///
/// Every MPI must be minimally encoded and the buffer must be consumed completely.
pub fn parse_mpis(raw: &[u8]) -> Result<Vec<Mpi>> {
    let mut i = raw;
    let mut mpis = Vec::new();
    while i.has_remaining() {
        let start = raw.len() - i.remaining();
        let mpi = Mpi::from_buf(&mut i)?;
        let end = raw.len() - i.remaining();
        ensure!(
            mpi.to_bytes()? == raw[start..end],
            "mpi {} is not minimally encoded",
            mpis.len()
        );
        mpis.push(mpi);
    }

    Ok(mpis)
}

/// Signature types
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    /// Signature of a binary document.
    /// This means the signer owns it, created it, or certifies that it has not been modified.
    Binary = 0x00,
    /// Signature of a canonical text document.
    Text = 0x01,
    /// Generic certification of a User ID and Public-Key packet.
    CertGeneric = 0x10,
    /// Positive certification of a User ID and Public-Key packet.
    /// The issuer of this certification has done substantial
    /// verification of the claim of identity.
    CertPositive = 0x13,
    /// Subkey Binding Signature
    /// This signature is a statement by the top-level signing key that
    /// indicates that it owns the subkey.  A signature that binds a signing
    /// subkey MUST have an Embedded Signature subpacket in this binding
    /// signature that contains a 0x19 signature made by the signing subkey on
    /// the primary key and subkey.
    SubkeyBinding = 0x18,
    /// Primary Key Binding Signature
    /// This signature is a statement by a signing subkey, indicating
    /// that it is owned by the primary key and subkey.
    KeyBinding = 0x19,

    #[num_enum(catch_all)]
    Other(u8),
}

bitfield! {
    #[derive(Default, PartialEq, Eq, Copy, Clone)]
    pub struct KeyFlags(u8);
    impl Debug;

    pub certify, set_certify: 0;
    pub sign, set_sign: 1;
    pub encrypt_comms, set_encrypt_comms: 2;
    pub encrypt_storage, set_encrypt_storage: 3;
    pub shared, set_shared: 4;
    pub authentication, set_authentication: 5;
    pub group, set_group: 7;
}

impl KeyFlags {
    /// Flags of a primary key that certifies and signs.
    pub fn certify_and_sign() -> Self {
        let mut flags = KeyFlags::default();
        flags.set_certify(true);
        flags.set_sign(true);
        flags
    }

    /// Flags of a signing-only subkey.
    pub fn sign_only() -> Self {
        let mut flags = KeyFlags::default();
        flags.set_sign(true);
        flags
    }
}

impl<'a> From<&'a [u8]> for KeyFlags {
    fn from(other: &'a [u8]) -> Self {
        if other.is_empty() {
            Default::default()
        } else {
            KeyFlags(other[0])
        }
    }
}

impl From<KeyFlags> for SmallVec<[u8; 1]> {
    fn from(flags: KeyFlags) -> Self {
        smallvec![flags.0]
    }
}

/// Key server preference flags.
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.3.17>
pub const KEYSERVER_NO_MODIFY: u8 = 0x80;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyflags() {
        let flags: KeyFlags = Default::default();
        assert_eq!(flags.0, 0x00);

        let mut flags = KeyFlags::default();
        flags.set_certify(true);
        assert!(flags.certify());
        assert_eq!(flags.0, 0x01);

        let mut flags = KeyFlags::default();
        flags.set_sign(true);
        assert_eq!(flags.0, 0x02);

        assert_eq!(KeyFlags::certify_and_sign().0, 0x03);
        assert_eq!(KeyFlags::sign_only().0, 0x02);
        assert_eq!(KeyFlags::from(&[0x03][..]), KeyFlags::certify_and_sign());
    }

    #[test]
    fn test_signature_type_ids() {
        assert_eq!(u8::from(SignatureType::CertPositive), 0x13);
        assert_eq!(u8::from(SignatureType::SubkeyBinding), 0x18);
        assert_eq!(u8::from(SignatureType::KeyBinding), 0x19);
        assert_eq!(SignatureType::from(0x00), SignatureType::Binary);
        assert_eq!(SignatureType::from(0x42), SignatureType::Other(0x42));
    }

    #[test]
    fn test_parse_mpis() {
        let mpis = parse_mpis(&[0x00, 0x01, 0x01, 0x00, 0x09, 0x01, 0xFF]).unwrap();
        assert_eq!(
            mpis,
            vec![Mpi::from_slice(&[0x01]), Mpi::from_slice(&[0x01, 0xFF])]
        );
        assert!(parse_mpis(&[]).unwrap().is_empty());

        // truncated
        assert!(parse_mpis(&[0x00, 0x09, 0x01]).is_err());
        // leading zero octet
        assert!(parse_mpis(&[0x00, 0x10, 0x00, 0x01]).is_err());
        // bit count does not match the value
        assert!(parse_mpis(&[0x00, 0x08, 0x01]).is_err());
    }
}
