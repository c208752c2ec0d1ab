use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use smallvec::SmallVec;

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, Timestamp};

use super::Signature;

/// Available signature subpacket types
///
/// Only the types written by this crate are named.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SubpacketType {
    SignatureCreationTime,
    Issuer,
    PreferredHashAlgorithms,
    PreferredCompressionAlgorithms,
    KeyServerPreferences,
    KeyFlags,
    EmbeddedSignature,
    Other(u8),
}

impl SubpacketType {
    pub fn as_u8(&self, is_critical: bool) -> u8 {
        let raw: u8 = match self {
            SubpacketType::SignatureCreationTime => 2,
            SubpacketType::Issuer => 16,
            SubpacketType::PreferredHashAlgorithms => 21,
            SubpacketType::PreferredCompressionAlgorithms => 22,
            SubpacketType::KeyServerPreferences => 23,
            SubpacketType::KeyFlags => 27,
            SubpacketType::EmbeddedSignature => 32,
            SubpacketType::Other(n) => *n,
        };

        if is_critical {
            // set critical bit
            raw | 0b1000_0000
        } else {
            raw
        }
    }
}

/// Represents a subpacket length.
///
/// Ref <https://www.rfc-editor.org/rfc/rfc4880.html#section-5.2.3.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum SubpacketLength {
    /// 1 byte encoding, must be less than `192`.
    One(#[cfg_attr(test, proptest(strategy = "0u8..=191"))] u8),
    /// 2 byte encoding, `192..=8383`
    Two(#[cfg_attr(test, proptest(strategy = "192u16..=8383"))] u16),
    /// 5 byte encoding
    Five(#[cfg_attr(test, proptest(strategy = "8384u32.."))] u32),
}

impl SubpacketLength {
    /// Parses a subpacket length from the given buffer.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let olen = i.read_u8()?;
        let len = match olen {
            // One-Octet Lengths
            0..=191 => Self::One(olen),
            // Two-Octet Lengths
            192..=254 => {
                let a = i.read_u8()?;
                let l = ((olen as u16 - 192) << 8) + 192 + a as u16;
                Self::Two(l)
            }
            255 => {
                let len = i.read_be_u32()?;
                Self::Five(len)
            }
        };
        Ok(len)
    }

    /// Encodes the given length into a minimal version
    pub(crate) fn encode(len: u32) -> Self {
        match len {
            0..=191 => Self::One(len as u8),
            192..=8383 => Self::Two(len as u16),
            _ => Self::Five(len),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::One(l) => *l as _,
            Self::Two(l) => *l as _,
            Self::Five(l) => *l as _,
        }
    }
}

impl Serialize for SubpacketLength {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::One(l) => {
                writer.write_u8(*l)?;
            }
            Self::Two(l) => {
                writer.write_u8((((l - 192) >> 8) + 192) as u8)?;
                writer.write_u8(((l - 192) & 0xFF) as u8)?;
            }
            Self::Five(l) => {
                writer.write_u8(0xFF)?;
                writer.write_u32::<BigEndian>(*l)?
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(_) => 2,
            Self::Five(_) => 5,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subpacket {
    pub is_critical: bool,
    pub data: SubpacketData,
    pub len: SubpacketLength,
}

impl Subpacket {
    /// Construct a new regular subpacket.
    pub fn regular(data: SubpacketData) -> Result<Self> {
        let raw_len = (data.write_len() + 1).try_into()?;
        let len = SubpacketLength::encode(raw_len);
        Ok(Subpacket {
            is_critical: false,
            data,
            len,
        })
    }

    /// Construct a new critical subpacket.
    pub fn critical(data: SubpacketData) -> Result<Self> {
        let raw_len = (data.write_len() + 1).try_into()?;
        let len = SubpacketLength::encode(raw_len);
        Ok(Subpacket {
            is_critical: true,
            data,
            len,
        })
    }

    pub fn typ(&self) -> SubpacketType {
        self.data.typ()
    }
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.len.to_writer(writer)?;
        writer.write_u8(self.typ().as_u8(self.is_critical))?;
        self.data.to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.len.write_len() + self.len.len()
    }
}

#[derive(derive_more::Debug, PartialEq, Eq, Clone)]
pub enum SubpacketData {
    /// The time the signature was made.
    SignatureCreationTime(Timestamp),
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer(KeyId),
    /// List of hash algorithms that indicate which algorithms the key holder prefers to use.
    PreferredHashAlgorithms(SmallVec<[HashAlgorithm; 8]>),
    /// List of compression algorithms that indicate which algorithms the key holder prefers to use.
    PreferredCompressionAlgorithms(SmallVec<[CompressionAlgorithm; 8]>),
    KeyServerPreferences(#[debug("{}", hex::encode(_0))] SmallVec<[u8; 4]>),
    KeyFlags(#[debug("{}", hex::encode(_0))] SmallVec<[u8; 1]>),
    /// A complete signature packet body, without packet header.
    EmbeddedSignature(Box<Signature>),
    Other(u8, #[debug("{}", hex::encode(_1))] Bytes),
}

impl SubpacketData {
    pub fn typ(&self) -> SubpacketType {
        match self {
            SubpacketData::SignatureCreationTime(_) => SubpacketType::SignatureCreationTime,
            SubpacketData::Issuer(_) => SubpacketType::Issuer,
            SubpacketData::PreferredHashAlgorithms(_) => SubpacketType::PreferredHashAlgorithms,
            SubpacketData::PreferredCompressionAlgorithms(_) => {
                SubpacketType::PreferredCompressionAlgorithms
            }
            SubpacketData::KeyServerPreferences(_) => SubpacketType::KeyServerPreferences,
            SubpacketData::KeyFlags(_) => SubpacketType::KeyFlags,
            SubpacketData::EmbeddedSignature(_) => SubpacketType::EmbeddedSignature,
            SubpacketData::Other(n, _) => SubpacketType::Other(*n),
        }
    }
}

impl Serialize for SubpacketData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SubpacketData::SignatureCreationTime(t) => t.to_writer(writer)?,
            SubpacketData::Issuer(id) => writer.write_all(id.as_ref())?,
            SubpacketData::PreferredHashAlgorithms(algs) => {
                for alg in algs {
                    writer.write_u8((*alg).into())?;
                }
            }
            SubpacketData::PreferredCompressionAlgorithms(algs) => {
                for alg in algs {
                    writer.write_u8((*alg).into())?;
                }
            }
            SubpacketData::KeyServerPreferences(prefs) => writer.write_all(prefs)?,
            SubpacketData::KeyFlags(flags) => writer.write_all(flags)?,
            SubpacketData::EmbeddedSignature(sig) => sig.to_writer(writer)?,
            SubpacketData::Other(_, body) => writer.write_all(body)?,
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            SubpacketData::SignatureCreationTime(_) => 4,
            SubpacketData::Issuer(_) => 8,
            SubpacketData::PreferredHashAlgorithms(algs) => algs.len(),
            SubpacketData::PreferredCompressionAlgorithms(algs) => algs.len(),
            SubpacketData::KeyServerPreferences(prefs) => prefs.len(),
            SubpacketData::KeyFlags(flags) => flags.len(),
            SubpacketData::EmbeddedSignature(sig) => sig.write_len(),
            SubpacketData::Other(_, body) => body.len(),
        }
    }
}

/// A single subpacket unit: the type octet followed by its payload.
///
/// The unit carries no length; [`subpackets`] prefixes it.
pub fn subpacket(typ: u8, payload: &[u8]) -> Vec<u8> {
    let mut unit = Vec::with_capacity(1 + payload.len());
    unit.push(typ);
    unit.extend_from_slice(payload);
    unit
}

/// Length-prefixes every unit, concatenates them in order and prefixes the
/// result with its two octet length.
pub fn subpackets<U: AsRef<[u8]>>(units: &[U]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    for unit in units {
        let unit = unit.as_ref();
        let len = u32::try_from(unit.len())?;
        SubpacketLength::encode(len).to_writer(&mut body)?;
        body.extend_from_slice(unit);
    }

    let mut out = Vec::with_capacity(2 + body.len());
    write_group_len(body.len(), &mut out)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Writes typed subpackets as one length-prefixed group.
pub(crate) fn write_subpackets<W: io::Write>(list: &[Subpacket], writer: &mut W) -> Result<()> {
    write_group_len(list.write_len(), writer)?;
    list.to_writer(writer)
}

fn write_group_len<W: io::Write>(len: usize, writer: &mut W) -> Result<()> {
    let Ok(len) = u16::try_from(len) else {
        encoding_err!("subpacket area of {} bytes exceeds 65535", len);
    };
    writer.write_u16::<BigEndian>(len)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use smallvec::smallvec;

    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_subpacket_unit() {
        assert_eq!(subpacket(27, &[0x03]), vec![27, 0x03]);
        assert_eq!(subpacket(16, &[]), vec![16]);
    }

    #[test]
    fn test_subpackets_group() {
        let units = [subpacket(2, &[0, 0, 0, 1]), subpacket(27, &[0x03])];
        assert_eq!(
            subpackets(&units).unwrap(),
            vec![0x00, 0x09, 0x05, 2, 0, 0, 0, 1, 0x02, 27, 0x03]
        );
        assert_eq!(subpackets::<Vec<u8>>(&[]).unwrap(), vec![0x00, 0x00]);
    }

    #[test]
    fn test_typed_matches_raw() {
        let typed = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(Timestamp::from_secs(
                1_600_000_000,
            )))
            .unwrap(),
            Subpacket::regular(SubpacketData::KeyFlags(smallvec![0x03])).unwrap(),
            Subpacket::regular(SubpacketData::PreferredHashAlgorithms(smallvec![
                HashAlgorithm::Sha256
            ]))
            .unwrap(),
            Subpacket::regular(SubpacketData::PreferredCompressionAlgorithms(smallvec![
                CompressionAlgorithm::Uncompressed
            ]))
            .unwrap(),
            Subpacket::regular(SubpacketData::KeyServerPreferences(smallvec![0x80])).unwrap(),
        ];
        let mut buf = Vec::new();
        write_subpackets(&typed, &mut buf).unwrap();

        let raw = subpackets(&[
            subpacket(2, &1_600_000_000u32.to_be_bytes()),
            subpacket(27, &[0x03]),
            subpacket(21, &[8]),
            subpacket(22, &[0]),
            subpacket(23, &[0x80]),
        ])
        .unwrap();
        assert_eq!(buf, raw);
    }

    #[test]
    fn test_critical_bit() {
        let sp = Subpacket::critical(SubpacketData::KeyFlags(smallvec![0x01])).unwrap();
        assert_eq!(sp.to_bytes().unwrap(), vec![0x02, 27 | 0x80, 0x01]);
        assert_eq!(SubpacketType::KeyFlags.as_u8(true), 27 | 0x80);
    }

    #[test]
    fn test_long_unit_uses_two_octet_length() {
        let unit = subpacket(100, &[0xAB; 199]);
        let group = subpackets(&[unit]).unwrap();
        // 200 = 192 + (0 << 8) + 8
        assert_eq!(&group[..4], &[0x00, 202, 192, 8]);
        assert_eq!(group.len(), 2 + 2 + 200);
    }

    #[test]
    fn test_oversize_group() {
        let unit = vec![0u8; 65536];
        assert!(matches!(subpackets(&[unit]), Err(Error::Encoding { .. })));

        let big = Subpacket::regular(SubpacketData::Other(
            100,
            Bytes::from(vec![0u8; 70000]),
        ))
        .unwrap();
        let mut buf = Vec::new();
        assert!(matches!(
            write_subpackets(&[big], &mut buf),
            Err(Error::Encoding { .. })
        ));
        // nothing was written for the rejected group
        assert!(buf.is_empty());
    }

    proptest! {
        #[test]
        fn subpacket_length_write_len(len: SubpacketLength) {
            let mut buf = Vec::new();
            len.to_writer(&mut buf).unwrap();
            prop_assert_eq!(buf.len(), len.write_len());
        }

        #[test]
        fn subpacket_length_roundtrip(len: SubpacketLength) {
            let mut buf = Vec::new();
            len.to_writer(&mut buf).unwrap();
            let new_len = SubpacketLength::from_buf(&mut &buf[..]).unwrap();
            prop_assert_eq!(len, new_len);
        }

        #[test]
        fn subpacket_length_encode_is_minimal(len in 0u32..100_000) {
            let encoded = SubpacketLength::encode(len);
            prop_assert_eq!(encoded.len(), len as usize);
            let expected = if len < 192 { 1 } else if len < 8384 { 2 } else { 5 };
            prop_assert_eq!(encoded.write_len(), expected);
        }
    }
}
