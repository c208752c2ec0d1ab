use std::io;

const CRLF: [u8; 2] = [b'\r', b'\n'];
const LF: [u8; 1] = [b'\n'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LineBreak {
    Crlf,
    Lf,
}

impl AsRef<[u8]> for LineBreak {
    fn as_ref(&self) -> &[u8] {
        match self {
            LineBreak::Crlf => &CRLF[..],
            LineBreak::Lf => &LF[..],
        }
    }
}

/// A `Write` implementation that splits any written bytes into lines of `N` bytes.
///
/// Every completed line is terminated with the configured line break. A trailing partial
/// line is terminated by [`LineWriter::finish`], so the output always ends in a line break
/// unless nothing was written at all.
pub struct LineWriter<'a, W: 'a + io::Write, const N: usize> {
    /// Which kind of line break to insert.
    line_break: LineBreak,
    /// Where the wrapped data is written to.
    w: &'a mut W,
    /// Bytes already written on the current line, in `[0, N)`.
    column: usize,
    /// True iff the trailing line break has been written.
    finished: bool,
}

impl<'a, W: io::Write, const N: usize> LineWriter<'a, W, N> {
    /// Create a new line writer around an existing writer.
    pub fn new(w: &'a mut W, line_break: LineBreak) -> Self {
        LineWriter {
            line_break,
            w,
            column: 0,
            finished: false,
        }
    }

    /// Terminates the last partial line.
    ///
    /// Once this succeeds, no further writes can be performed.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }

        if self.column > 0 {
            self.w.write_all(self.line_break.as_ref())?;
            self.column = 0;
        }

        self.finished = true;
        Ok(())
    }
}

impl<'a, W: io::Write, const N: usize> io::Write for LineWriter<'a, W, N> {
    fn write(&mut self, input: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "cannot write more after calling finish()",
            ));
        }

        let mut rest = input;
        while !rest.is_empty() {
            let take = (N - self.column).min(rest.len());
            self.w.write_all(&rest[..take])?;
            self.column += take;
            rest = &rest[take..];

            if self.column == N {
                self.w.write_all(self.line_break.as_ref())?;
                self.column = 0;
            }
        }

        Ok(input.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

impl<'a, W: io::Write, const N: usize> Drop for LineWriter<'a, W, N> {
    fn drop(&mut self) {
        // like `BufWriter`, ignore errors during drop
        let _ = self.finish();
    }
}
