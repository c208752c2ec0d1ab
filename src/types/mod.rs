mod fingerprint;
mod key_id;
mod mpi;
mod packet;
mod timestamp;
mod verifying_key;

pub use self::fingerprint::*;
pub use self::key_id::*;
pub use self::mpi::*;
pub use self::packet::*;
pub use self::timestamp::*;
pub use self::verifying_key::*;
