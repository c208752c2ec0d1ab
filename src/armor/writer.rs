use std::collections::BTreeMap;
use std::hash::Hasher;
use std::io::{self, Write};

use base64::engine::{general_purpose, Engine as _};
use crc24::Crc24Hasher;

use crate::armor::BlockType;
use crate::crypto::checksum::{crc24_bytes, finish_crc24};
use crate::errors::Result;
use crate::line_writer::{LineBreak, LineWriter};
use crate::ser::Serialize;

/// Writes `source` as an armored block of type `typ`.
///
/// Headers are written in key order. The checksum line is always included.
pub fn write<S: Serialize + ?Sized>(
    source: &S,
    typ: BlockType,
    writer: &mut impl Write,
    headers: Option<&BTreeMap<String, String>>,
) -> Result<()> {
    // write armor header
    writer.write_all(&b"-----BEGIN "[..])?;
    typ.to_writer(writer)?;
    writer.write_all(&b"-----\n"[..])?;

    // write armor headers
    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            writer.write_all(key.as_bytes())?;
            writer.write_all(&b": "[..])?;
            writer.write_all(value.as_bytes())?;
            writer.write_all(&b"\n"[..])?;
        }
    }

    writer.write_all(&b"\n"[..])?;
    writer.flush()?;

    // write body
    let mut crc_hasher = Crc24Hasher::new();
    {
        let mut line_wrapper = LineWriter::<_, 64>::new(writer.by_ref(), LineBreak::Lf);
        {
            let mut enc = ZeroWrapper(base64::write::EncoderWriter::new(
                &mut line_wrapper,
                &general_purpose::STANDARD,
            ));
            let mut tee = CrcTee {
                crc: &mut crc_hasher,
                inner: &mut enc,
            };
            source.to_writer(&mut tee)?;
            enc.0.finish()?;
        }
        line_wrapper.finish()?;
    }

    // write crc
    writer.write_all(b"=")?;
    let crc_enc = general_purpose::STANDARD.encode(crc24_bytes(finish_crc24(&crc_hasher)));
    writer.write_all(crc_enc.as_bytes())?;
    writer.write_all(&b"\n"[..])?;

    // write footer
    writer.write_all(&b"-----END "[..])?;
    typ.to_writer(writer)?;
    writer.write_all(&b"-----\n"[..])?;

    Ok(())
}

/// Feeds everything written through it into a CRC-24 hasher.
struct CrcTee<'a, W: Write> {
    crc: &'a mut Crc24Hasher,
    inner: W,
}

impl<W: Write> Write for CrcTee<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc.write(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wrapper to deal with the special way the base64 encoder works.
/// Otherwise we can't use `write_all`.
///
/// Ref https://github.com/marshallpierce/rust-base64/issues/148
struct ZeroWrapper<W: Write>(W);

impl<W: Write> Write for ZeroWrapper<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {}
                Ok(n) => buf = &buf[n..],
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
