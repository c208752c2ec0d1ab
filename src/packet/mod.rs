//! # Packet module
//!
//! Everything that ends up on the wire: legacy packet framing, the public key
//! packet, user ids and v4 signatures with their subpackets.
//!
//! ```rust
//! use pgp_remote_signer::packet::{packet, subpacket, subpackets};
//! use pgp_remote_signer::types::Tag;
//!
//! let body = subpackets(&[subpacket(27, &[0x03])]).unwrap();
//! assert_eq!(body, vec![0x00, 0x03, 0x02, 27, 0x03]);
//!
//! let framed = packet(Tag::Signature, &body).unwrap();
//! assert_eq!(framed[..2], [0x88, 0x05]);
//! ```

mod header;
mod key;
mod user_id;

pub mod signature;

pub use self::header::*;
pub use self::key::*;
pub use self::signature::*;
pub use self::user_id::*;
