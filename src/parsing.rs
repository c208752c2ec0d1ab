//! Parsing functions to parse data using [Buf].

use bytes::{Buf, Bytes};

use crate::errors::Result;

pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.get_u8())
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.get_u16())
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        Ok(self.get_u32())
    }

    fn read_take(&mut self, size: usize) -> Result<Bytes> {
        self.ensure_remaining(size)?;
        Ok(self.copy_to_bytes(size))
    }

    fn ensure_remaining(&self, needed: usize) -> Result<()> {
        ensure!(
            self.remaining() >= needed,
            "needed {}, remaining {}",
            needed,
            self.remaining()
        );
        Ok(())
    }
}

impl<B: Buf> BufParsing for B {}
