use std::num::TryFromIntError;

use snafu::{Backtrace, Snafu};

use crate::adapter::AuthorityError;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::packet::SignatureType;
use crate::types::{KeyId, Timestamp, TimestampError};

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// A packet, subpacket group or MPI does not fit its length field.
    #[snafu(display("encoding error: {message}"))]
    Encoding { message: String },
    #[snafu(display("unsupported curve: {curve}"))]
    UnsupportedCurve { curve: String },
    /// The external signing authority refused, failed or answered with garbage.
    #[snafu(display("signing authority failed on {typ:?} signature (issuer {issuer:?})"))]
    SigningAuthority {
        typ: SignatureType,
        issuer: Option<KeyId>,
        source: AuthorityError,
    },
    /// The signing authority failed outside of a signature, while handing out its key or
    /// while being released.
    #[snafu(display("signing authority failed: {source}"))]
    Authority { source: AuthorityError },
    /// A reconstructed key disagrees with what was recorded for it.
    #[snafu(display("integrity check of key {expected} failed: {mismatch}"))]
    Integrity {
        expected: KeyId,
        mismatch: KeyMismatch,
    },
    #[snafu(display("{message}"))]
    Message { message: String },
    #[snafu(transparent)]
    IO {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(transparent)]
    TryFromInt { source: TryFromIntError },
    #[snafu(transparent)]
    Timestamp { source: TimestampError },
    #[snafu(transparent)]
    Ed25519 {
        source: ed25519_dalek::SignatureError,
    },
    #[snafu(transparent)]
    EllipticCurve { source: elliptic_curve::Error },
}

/// The property a reconstructed key disagrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum KeyMismatch {
    #[display("computed key id {actual}")]
    KeyId { actual: KeyId },
    #[display("recorded creation time {recorded}, key says {actual}")]
    Created {
        recorded: Timestamp,
        actual: Timestamp,
    },
    #[display("recorded algorithm {recorded}, key says {actual}")]
    Algorithm {
        recorded: PublicKeyAlgorithm,
        actual: PublicKeyAlgorithm,
    },
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Message { message: err }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Error {
        Error::Message {
            message: err.to_string(),
        }
    }
}

macro_rules! encoding_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Encoding { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Encoding { message: format!($fmt, $($arg)+) })
    };
}

macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message { message: format!($fmt, $($arg)+) })
    };
}

macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message { message: $e.to_string() }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message { message: format!($fmt, $($arg)+) }
    };
}

macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           format_args!($($arg)+))
                }
            }
        }
    });
}
