use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

use crate::errors::Result;
use crate::packet::header::PacketTrait;
use crate::ser::Serialize;
use crate::types::Tag;

/// Octet that introduces a user id in certification hashes.
const CERTIFICATION_PREFIX: u8 = 0xB4;

/// User ID Packet
/// <https://tools.ietf.org/html/rfc4880.html#section-5.11>
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
#[debug("UserId({:?})", String::from_utf8_lossy(id))]
pub struct UserId {
    id: Bytes,
}

impl UserId {
    pub fn from_str(input: &str) -> Self {
        UserId {
            id: Bytes::copy_from_slice(input.as_bytes()),
        }
    }

    pub fn from_slice(input: &[u8]) -> Self {
        UserId {
            id: Bytes::copy_from_slice(input),
        }
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// The form hashed by a certification over this id: `0xB4 ‖ u32 length ‖ id`.
    pub fn certification_data(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(5 + self.id.len());
        out.write_u8(CERTIFICATION_PREFIX)?;
        out.write_u32::<BigEndian>(self.id.len().try_into()?)?;
        out.extend_from_slice(&self.id);
        Ok(out)
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.id)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}

impl PacketTrait for UserId {
    fn tag(&self) -> Tag {
        Tag::UserId
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_certification_data() {
        let uid = UserId::from_str("Alice");
        assert_eq!(
            uid.certification_data().unwrap(),
            hex!("b4 00000005 416c696365").to_vec()
        );
        assert_eq!(format!("{uid:?}"), "UserId(\"Alice\")");
    }

    #[test]
    fn test_packet() {
        let uid = UserId::from_slice(b"Alice");
        let packet = uid.to_packet().unwrap();
        assert_eq!(packet, hex!("b4 05 416c696365").to_vec());
        // the certification prefix is the header octet of a short user id packet
        assert_eq!(packet[0], uid.certification_data().unwrap()[0]);
    }
}
