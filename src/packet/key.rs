use std::{fmt, io};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use log::debug;

use crate::crypto::ecc_curve::ECCCurve;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::header::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyId, Mpi, Tag, Timestamp, VerifyingKey};

/// Key packet version, only v4 keys are written.
const KEY_VERSION: u8 = 4;

/// Prefix of a public key when it is hashed for a fingerprint or a signature.
const HASHABLE_KEY_PREFIX: u8 = 0x99;

/// A v4 elliptic curve public key.
///
/// Immutable once built; the fingerprint is computed on construction.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.5.2>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
#[debug("PublicKey({curve}, {created:?}, {fingerprint})")]
pub struct PublicKey {
    curve: ECCCurve,
    created: Timestamp,
    key: VerifyingKey,
    /// Serialized public point, as stored in the packet.
    point: Mpi,
    fingerprint: Fingerprint,
}

impl PublicKey {
    pub fn new(curve: ECCCurve, created: Timestamp, key: VerifyingKey) -> Result<Self> {
        let point = curve.serialize(&key)?;

        let mut body = Vec::new();
        write_body(curve, created, &point, &mut body)?;
        let mut hashable = Vec::with_capacity(3 + body.len());
        write_hashable_prefix(body.len(), &mut hashable)?;
        hashable.extend_from_slice(&body);
        let fingerprint = Fingerprint::from_hashable(&hashable)?;

        debug!("public key {} on {} created {}", fingerprint.key_id(), curve, created);
        Ok(PublicKey {
            curve,
            created,
            key,
            point,
            fingerprint,
        })
    }

    /// Reconstructs a key from `0x99 ‖ u16 length ‖ body`, the form it was hashed in.
    ///
    /// Only v4 keys on one of the supported curves are accepted.
    pub fn from_hashable_bytes(raw: &[u8]) -> Result<Self> {
        let mut i = raw;
        ensure_eq!(i.read_u8()?, HASHABLE_KEY_PREFIX, "invalid hashable key prefix");
        let len = i.read_be_u16()?;
        ensure_eq!(
            usize::from(len),
            i.remaining(),
            "hashable key length does not match"
        );

        let version = i.read_u8()?;
        ensure_eq!(version, KEY_VERSION, "unsupported key version");

        let created = Timestamp::from_secs(i.read_be_u32()?);
        let curve = ECCCurve::from_algorithm(i.read_u8()?.into())?;

        let oid_len = i.read_u8()?;
        let oid = i.read_take(oid_len.into())?;
        ensure!(
            oid.as_ref() == curve.oid(),
            "oid {} does not match {}",
            hex::encode(&oid),
            curve
        );

        let point = Mpi::from_buf(&mut i)?;
        ensure!(!i.has_remaining(), "trailing data after public key");

        let key = VerifyingKey::from_mpi(curve, &point)?;
        let pk = PublicKey::new(curve, created, key)?;
        ensure!(
            pk.data_to_hash()? == raw,
            "public key does not reencode to its hashable form"
        );

        Ok(pk)
    }

    pub fn curve(&self) -> ECCCurve {
        self.curve
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.curve.algorithm()
    }

    pub fn created(&self) -> Timestamp {
        self.created
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }

    /// The packet body.
    pub fn data(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    /// `0x99 ‖ u16 length ‖ body`, the form covered by fingerprints and key signatures.
    pub fn data_to_hash(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(3 + self.write_len());
        self.serialize_for_hashing(&mut out)?;
        Ok(out)
    }

    pub fn serialize_for_hashing<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_hashable_prefix(self.write_len(), writer)?;
        self.to_writer(writer)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn key_id(&self) -> KeyId {
        self.fingerprint.key_id()
    }

    /// Views this key as a subkey packet.
    pub fn as_subkey(&self) -> PublicSubkey<'_> {
        PublicSubkey(self)
    }
}

/// `version ‖ created ‖ algorithm ‖ oid length ‖ oid ‖ point`
fn write_body<W: io::Write>(
    curve: ECCCurve,
    created: Timestamp,
    point: &Mpi,
    writer: &mut W,
) -> Result<()> {
    let oid = curve.oid();

    writer.write_u8(KEY_VERSION)?;
    created.to_writer(writer)?;
    writer.write_u8(curve.algorithm().into())?;
    writer.write_u8(oid.len().try_into()?)?;
    writer.write_all(oid)?;
    point.to_writer(writer)
}

// When a v4 signature is made over a key, the hash data starts with the octet 0x99,
// followed by a two-octet length of the key, and then the body of the key packet.
fn write_hashable_prefix<W: io::Write>(key_len: usize, writer: &mut W) -> Result<()> {
    let Ok(len) = u16::try_from(key_len) else {
        encoding_err!("public key of {} bytes does not fit a two octet length", key_len);
    };
    writer.write_u8(HASHABLE_KEY_PREFIX)?;
    writer.write_u16::<BigEndian>(len)?;
    Ok(())
}

impl Serialize for PublicKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_body(self.curve, self.created, &self.point, writer)
    }

    fn write_len(&self) -> usize {
        1 + 4 + 1 + 1 + self.curve.oid().len() + self.point.write_len()
    }
}

impl PacketTrait for PublicKey {
    fn tag(&self) -> Tag {
        Tag::PublicKey
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.key_id())
    }
}

/// A public key written with the subkey tag.
#[derive(Debug, Clone, Copy)]
pub struct PublicSubkey<'a>(&'a PublicKey);

impl Serialize for PublicSubkey<'_> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.0.to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.0.write_len()
    }
}

impl PacketTrait for PublicSubkey<'_> {
    fn tag(&self) -> Tag {
        Tag::PublicSubkey
    }
}
