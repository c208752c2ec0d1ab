//! # Armor module
//!
//! ASCII Armor as specified in RFC 4880, section 6.2: a header line, armor headers, base64
//! wrapped at 64 columns, a CRC-24 checksum line and a footer.

use std::collections::BTreeMap;
use std::{fmt, io};

use crate::errors::Result;
use crate::ser::Serialize;

mod writer;

pub use self::writer::*;

/// Comment header written by [`armor`].
pub const DEFAULT_VERSION: &str = "GnuPG v2";

/// The kind of data an armored block carries.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum BlockType {
    /// PGP public key
    PublicKey,
    Message,
    Signature,
    /// Any other label, written as `PGP <label>`.
    Other(String),
}

impl BlockType {
    /// Maps a label such as `PUBLIC KEY BLOCK` to its block type.
    pub fn from_label(label: &str) -> Self {
        match label {
            "PUBLIC KEY BLOCK" => BlockType::PublicKey,
            "MESSAGE" => BlockType::Message,
            "SIGNATURE" => BlockType::Signature,
            other => BlockType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::PublicKey => f.write_str("PGP PUBLIC KEY BLOCK"),
            BlockType::Message => f.write_str("PGP MESSAGE"),
            BlockType::Signature => f.write_str("PGP SIGNATURE"),
            BlockType::Other(label) => write!(f, "PGP {label}"),
        }
    }
}

impl Serialize for BlockType {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "{self}")?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        // allocates, but this is tiny
        self.to_string().len()
    }
}

/// Armors `blob` as `-----BEGIN PGP <label>-----` with a `Version: GnuPG v2` header.
pub fn armor(blob: &[u8], label: &str) -> Result<String> {
    armor_with_version(blob, BlockType::from_label(label), DEFAULT_VERSION)
}

/// Armors `blob` as `typ`, using `version` as the `Version` header.
pub fn armor_with_version(blob: &[u8], typ: BlockType, version: &str) -> Result<String> {
    let mut headers = BTreeMap::new();
    headers.insert("Version".to_string(), version.to_string());

    let mut out = Vec::with_capacity(blob.len() * 4 / 3 + 128);
    write(blob, typ, &mut out, Some(&headers))?;

    // base64 and the fixed header lines are ASCII
    String::from_utf8(out).map_err(|err| format_err!("armor is not utf-8: {}", err))
}
