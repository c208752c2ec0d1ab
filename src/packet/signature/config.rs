use std::fmt;
use std::io;

use byteorder::{BigEndian, ByteOrder};
use derive_builder::Builder;
use log::debug;
use snafu::ResultExt;

use crate::adapter::{AuthorityError, SigningCapability};
use crate::crypto::hash::{HashAlgorithm, WriteHasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{Error, Result, SigningAuthoritySnafu};
use crate::packet::signature::subpacket::{write_subpackets, Subpacket, SubpacketData};
use crate::packet::signature::types::{parse_mpis, Signature, SignatureHeader, SignatureType};
use crate::ser::Serialize;
use crate::types::{KeyId, Timestamp};

#[derive(Clone, PartialEq, Eq, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct SignatureConfig {
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,

    #[builder(default)]
    pub hash_alg: HashAlgorithm,

    #[builder(default)]
    pub hashed_subpackets: Vec<Subpacket>,
    #[builder(default)]
    pub unhashed_subpackets: Vec<Subpacket>,
}

impl SignatureConfig {
    pub fn new_v4(
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        hashed_subpackets: Vec<Subpacket>,
        unhashed_subpackets: Vec<Subpacket>,
    ) -> Self {
        SignatureConfig {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets,
            unhashed_subpackets,
        }
    }

    /// Sign the given data.
    ///
    /// Hashes `data_to_sign` followed by the hashed part of this signature and its trailer,
    /// then hands the digest to `signer`. The signer must answer with concatenated MPIs.
    pub fn sign<S>(self, signer: &mut S, data_to_sign: &[u8]) -> Result<Signature>
    where
        S: SigningCapability + ?Sized,
    {
        let hash = self.digest(data_to_sign)?;
        let signed_hash_value = [hash[0], hash[1]];

        let typ = self.typ;
        let issuer = self.issuer().copied();

        let raw = signer
            .sign(&hash)
            .context(SigningAuthoritySnafu { typ, issuer })?;
        let signature = parse_mpis(&raw)
            .map_err(|err| AuthorityError::Malformed {
                reason: err.to_string(),
            })
            .context(SigningAuthoritySnafu { typ, issuer })?;

        let expected = self.pub_alg.signature_mpi_count();
        if expected != Some(signature.len()) {
            return Err(AuthorityError::Malformed {
                reason: format!(
                    "{} MPIs in a {} signature value, expected {:?}",
                    signature.len(),
                    self.pub_alg,
                    expected
                ),
            })
            .context(SigningAuthoritySnafu { typ, issuer });
        }

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Computes the digest that gets signed.
    pub fn digest(&self, data_to_sign: &[u8]) -> Result<Vec<u8>> {
        let mut hasher = self.hash_alg.new_hasher()?;
        hasher.update(data_to_sign);

        let len = self.hash_signature_data(&mut WriteHasher(&mut hasher))?;
        hasher.update(&self.trailer(len)?);

        debug!(
            "hashing {} bytes for {:?} signature",
            data_to_sign.len() + len + 6,
            self.typ
        );

        Ok(hasher.finalize().to_vec())
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// The version, type and algorithm octets.
    pub fn header(&self) -> SignatureHeader {
        SignatureHeader {
            typ: self.typ,
            pub_alg: self.pub_alg,
            hash_alg: self.hash_alg,
        }
    }

    /// Writes the part of the serialized signature that is covered by the hash.
    ///
    /// Returns the number of bytes written.
    pub fn hash_signature_data<W: io::Write>(&self, writer: &mut W) -> Result<usize> {
        let mut res = Vec::new();
        self.header().to_writer(&mut res)?;
        write_subpackets(&self.hashed_subpackets, &mut res)?;

        writer.write_all(&res)?;

        Ok(res.len())
    }

    /// The v4 trailer: `0x04 0xFF` and the length of the hashed data.
    pub fn trailer(&self, len: usize) -> Result<[u8; 6]> {
        let mut trailer = [0x04, 0xFF, 0, 0, 0, 0];
        BigEndian::write_u32(&mut trailer[2..], len.try_into()?);
        Ok(trailer)
    }

    /// Returns an iterator over all subpackets of this signature.
    pub fn subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::SignatureCreationTime(d) => Some(*d),
            _ => None,
        })
    }

    pub fn issuer(&self) -> Option<&KeyId> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::Issuer(id) => Some(id),
            _ => None,
        })
    }
}

impl fmt::Debug for SignatureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureConfig")
            .field("typ", &self.typ)
            .field("pub_alg", &self.pub_alg)
            .field("hash_alg", &self.hash_alg)
            .field("unhashed_subpackets", &self.unhashed_subpackets)
            .field("hashed_subpackets", &self.hashed_subpackets)
            .finish()
    }
}
