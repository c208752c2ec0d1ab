pub mod config;
pub mod subpacket;
pub mod types;

pub use self::config::*;
pub use self::subpacket::{
    subpacket, subpackets, Subpacket, SubpacketData, SubpacketLength, SubpacketType,
};
pub use self::types::*;
