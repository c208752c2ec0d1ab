use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use num_bigint::BigUint;

use crate::errors::{Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Number of bits we accept when reading MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// Represents an owned MPI value.
/// The inner value is ready to be serialized, without the need to strip leading zeros.
///
/// Ref: <https://www.rfc-editor.org/rfc/rfc4880.html#section-3.2>
#[derive(Default, Clone, PartialEq, Eq, derive_more::Debug)]
pub struct Mpi(#[debug("{}", hex::encode(_0))] Bytes);

impl Mpi {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the given buffer as an MPI.
    ///
    /// The buffer is expected to be length-prefixed.
    pub fn from_buf<B: bytes::Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;

        if len_bits > MAX_EXTERN_MPI_BITS {
            return Err(Error::Message {
                message: format!("mpi too long: {len_bits} bits"),
            });
        }

        let len_bytes = (len_bits + 7) >> 3;

        let n = i.read_take(usize::from(len_bytes))?;
        let n_stripped = strip_leading_zeros(&n);
        let n_stripped = n.slice_ref(n_stripped);

        Ok(Mpi(n_stripped))
    }

    /// Represent the data in `raw` as an Mpi.
    /// Note that `raw` is not expected to be length-prefixed!
    ///
    /// Strips leading zeros.
    pub fn from_slice(raw: &[u8]) -> Self {
        Self(strip_leading_zeros(raw).to_vec().into())
    }

    /// Number of significant bits, `0` for the value zero.
    pub fn bit_len(&self) -> usize {
        bit_size(&self.0)
    }
}

/// Returns the bit length of a given slice.
#[inline]
fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    bytes
        .iter()
        .position(|b| b != &0)
        .map_or(&[], |offset| &bytes[offset..])
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let bytes = &self.0;
        let Ok(size) = u16::try_from(bit_size(bytes)) else {
            encoding_err!("mpi of {} bytes exceeds 65535 bits", bytes.len());
        };
        w.write_u16::<BigEndian>(size)?;
        w.write_all(bytes)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<BigUint> for Mpi {
    fn from(other: BigUint) -> Self {
        Mpi::from(&other)
    }
}

impl From<&BigUint> for Mpi {
    fn from(other: &BigUint) -> Self {
        // `to_bytes_be` yields `[0]` for zero, which must encode as no bytes at all
        Mpi::from_slice(&other.to_bytes_be())
    }
}

impl From<Mpi> for BigUint {
    fn from(other: Mpi) -> Self {
        BigUint::from_bytes_be(other.as_ref())
    }
}
