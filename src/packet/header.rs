use std::io;

use bitfield::bitfield;
use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use log::debug;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Tag;

bitfield! {
    /// Old format packet header ("Legacy format")
    ///
    /// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-4.2>
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct OldPacketHeader(u8);
    impl Debug;

    /// Packet Tag, only 4 bits wide in this format
    pub u8, tag, set_tag: 5, 2;
    /// length-type
    pub u8, length_type, set_length_type: 1, 0;
}

/// Bit 7 always one, bit 6 zero selects the old format.
const OLD_FORMAT_MARKER: u8 = 0b1000_0000;

/// Largest tag an old format header can carry.
const MAX_OLD_TAG: u8 = 0b1111;

impl OldPacketHeader {
    fn new(tag: u8, length_type: u8) -> Self {
        let mut header = OldPacketHeader(OLD_FORMAT_MARKER);
        header.set_tag(tag);
        header.set_length_type(length_type);
        header
    }
}

/// A legacy packet header with a fixed body length.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    header: OldPacketHeader,
    length: u32,
}

impl PacketHeader {
    /// Builds the header for a body of `len` bytes, picking the smallest length class.
    pub fn from_parts(tag: Tag, len: usize) -> Result<Self> {
        let raw_tag: u8 = tag.into();
        if raw_tag > MAX_OLD_TAG {
            encoding_err!("tag {:?} is not compatible with old packet headers", tag);
        }
        let Ok(length) = u32::try_from(len) else {
            encoding_err!("packet body of {} bytes does not fit a 4 octet length", len);
        };

        Ok(PacketHeader {
            header: OldPacketHeader::new(raw_tag, old_fixed_type(length)),
            length,
        })
    }

    /// Parse a single legacy packet header from the given buffer.
    pub fn from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let raw = i.read_u8()?;
        ensure_eq!(
            raw & 0b1100_0000,
            OLD_FORMAT_MARKER,
            "not an old format packet header"
        );

        let header = OldPacketHeader(raw);
        let length = match header.length_type() {
            // One-Octet Lengths
            0 => i.read_u8()?.into(),
            // Two-Octet Lengths
            1 => i.read_be_u16()?.into(),
            // Four-Octet Lengths
            2 => i.read_be_u32()?,
            _ => bail!("indeterminate packet lengths are not supported"),
        };

        Ok(PacketHeader { header, length })
    }

    /// Returns the packet tag.
    pub fn tag(&self) -> Tag {
        self.header.tag().into()
    }

    /// Returns the length class, `0`, `1` or `2`.
    pub fn length_type(&self) -> u8 {
        self.header.length_type()
    }

    /// Returns the body length.
    pub fn packet_length(&self) -> u32 {
        self.length
    }
}

impl Serialize for PacketHeader {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.header.0)?;
        match self.header.length_type() {
            // one octet
            0 => writer.write_u8(self.length as u8)?,
            // two octets
            1 => writer.write_u16::<BigEndian>(self.length as u16)?,
            // four octets
            _ => writer.write_u32::<BigEndian>(self.length)?,
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + match self.header.length_type() {
            0 => 1,
            1 => 2,
            _ => 4,
        }
    }
}

fn old_fixed_type(len: u32) -> u8 {
    if len < 256 {
        0
    } else if len < 65536 {
        1
    } else {
        2
    }
}

/// Frames `body` as a complete packet with the given tag.
///
/// Packets are always written with a legacy header, which has room for tags `0..=15`
/// only. Larger tags fail with [`Error::Encoding`](crate::errors::Error::Encoding).
pub fn packet(tag: Tag, body: &[u8]) -> Result<Vec<u8>> {
    let header = PacketHeader::from_parts(tag, body.len())?;
    debug!("writing packet header {:?}", header);

    let mut out = Vec::with_capacity(header.write_len() + body.len());
    header.to_writer(&mut out)?;
    out.extend_from_slice(body);

    Ok(out)
}

/// Anything that can be written as the body of a packet.
pub trait PacketTrait: Serialize {
    fn tag(&self) -> Tag;

    fn to_writer_with_header<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let header = PacketHeader::from_parts(self.tag(), self.write_len())?;
        header.to_writer(writer)?;
        self.to_writer(writer)
    }

    /// Header and body as one buffer.
    fn to_packet(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.write_len() + 5);
        self.to_writer_with_header(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_header_byte() {
        let p = packet(Tag::PublicKey, &[1, 2, 3]).unwrap();
        assert_eq!(p, vec![0x98, 0x03, 1, 2, 3]);

        let p = packet(Tag::Signature, &[]).unwrap();
        assert_eq!(p, vec![0x88, 0x00]);

        let p = packet(Tag::UserId, b"a").unwrap();
        assert_eq!(p, vec![0xB4, 0x01, b'a']);

        let p = packet(Tag::PublicSubkey, &[0]).unwrap();
        assert_eq!(p, vec![0xB8, 0x01, 0x00]);
    }

    #[test]
    fn test_length_class_boundaries() {
        for (len, class, header_len) in [
            (254usize, 0u8, 2usize),
            (255, 0, 2),
            (256, 1, 3),
            (257, 1, 3),
            (65534, 1, 3),
            (65535, 1, 3),
            (65536, 2, 5),
            (65537, 2, 5),
        ] {
            let body = vec![0xAA; len];
            let p = packet(Tag::Signature, &body).unwrap();
            assert_eq!(p[0], 0x80 | (2 << 2) | class, "len {len}");
            assert_eq!(p.len(), header_len + len, "len {len}");

            let mut buf = &p[..];
            let header = PacketHeader::from_buf(&mut buf).unwrap();
            assert_eq!(header.tag(), Tag::Signature);
            assert_eq!(header.length_type(), class);
            assert_eq!(header.packet_length() as usize, len);
            assert_eq!(buf, &body[..]);
        }
    }

    #[test]
    fn test_tag_too_large() {
        for tag in [16, 17, 63] {
            let err = packet(Tag::Other(tag), &[1]).unwrap_err();
            assert!(matches!(err, Error::Encoding { .. }));
        }
        assert_eq!(packet(Tag::Other(15), &[1]).unwrap()[0], 0xBC);
    }

    #[test]
    fn test_indeterminate_is_rejected() {
        assert!(PacketHeader::from_buf(&mut &[0x8B][..]).is_err());
        // new format
        assert!(PacketHeader::from_buf(&mut &[0xC2, 0x01][..]).is_err());
    }

    proptest! {
        #[test]
        fn packet_roundtrip(tag in 0u8..=15, body in prop::collection::vec(any::<u8>(), 0..1024)) {
            let p = packet(Tag::from(tag), &body)?;
            let mut buf = &p[..];
            let header = PacketHeader::from_buf(&mut buf)?;

            prop_assert_eq!(u8::from(header.tag()), tag);
            prop_assert_eq!(header.packet_length() as usize, body.len());
            prop_assert_eq!(header.write_len() + body.len(), p.len());
            prop_assert_eq!(buf, &body[..]);
        }
    }
}
