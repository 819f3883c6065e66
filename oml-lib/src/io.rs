//! Where the interpreter reads from and writes to.
//!
//! Both sides are trait objects, so the cli can hand in stdin/stdout and tests
//! can hand in byte buffers.

use crate::radix;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::mem::ManuallyDrop;
use tracing::debug;

pub const STDOUT: i64 = 1;
pub const STDERR: i64 = 2;

pub struct Input {
    reader: Box<dyn BufRead>,
}

impl Input {
    pub fn new(reader: impl BufRead + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }

    pub fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let b = self.peek_byte()?;
        if b.is_some() {
            self.reader.consume(1);
        }
        Ok(b)
    }

    /// true if there is at least one more byte
    pub fn has_remaining(&mut self) -> io::Result<bool> {
        Ok(self.peek_byte()?.is_some())
    }

    pub fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek_byte()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.reader.consume(1);
        }
        Ok(())
    }

    /// Reads an optionally signed integer written in `base`, skipping leading
    /// whitespace.
    ///
    /// None if there was no number. In that case the offending byte is
    /// consumed, so that reading in a loop can't get stuck on garbage.
    pub fn read_int(&mut self, base: i64) -> io::Result<Option<i64>> {
        self.skip_whitespace()?;
        let mut negative = false;
        if let Some(b @ (b'-' | b'+')) = self.peek_byte()? {
            negative = b == b'-';
            self.reader.consume(1);
        }
        let mut res: i64 = 0;
        let mut digits = 0;
        while let Some(b) = self.peek_byte()? {
            let Some(d) = radix::digit_value(b, base) else {
                break;
            };
            res = res.wrapping_mul(base).wrapping_add(d);
            digits += 1;
            self.reader.consume(1);
        }
        if digits == 0 {
            self.read_byte()?;
            return Ok(None);
        }
        Ok(Some(if negative { res.wrapping_neg() } else { res }))
    }

    /// reads up to and including the next newline
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = vec![];
        self.reader.read_until(b'\n', &mut line)?;
        Ok(line)
    }
}

/// Maps stream numbers to writers. 1 and 2 are stdout and stderr unless
/// replaced. Any other descriptor the process has open can be written to
/// without attaching it first.
pub struct Outputs {
    streams: HashMap<i64, Box<dyn Write>>,
}

impl Default for Outputs {
    fn default() -> Self {
        let mut res = Self {
            streams: HashMap::new(),
        };
        res.attach(STDOUT, io::stdout());
        res.attach(STDERR, io::stderr());
        res
    }
}

impl Outputs {
    pub fn attach(&mut self, stream: i64, w: impl Write + 'static) {
        self.streams.insert(stream, Box::new(w));
    }

    /// None if nothing is attached as `stream` and the process has no such
    /// descriptor open
    pub fn get(&mut self, stream: i64) -> Option<&mut (dyn Write + 'static)> {
        if !self.streams.contains_key(&stream) {
            let fd = Descriptor::open(stream)?;
            debug!(stream, "writing to inherited descriptor");
            self.streams.insert(stream, Box::new(fd));
        }
        self.streams.get_mut(&stream).map(|w| w.as_mut())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for w in self.streams.values_mut() {
            w.flush()?;
        }
        Ok(())
    }
}

/// A descriptor the process already had open, e.g. from `3>log` in the
/// shell. It is never closed from here.
struct Descriptor(ManuallyDrop<File>);

impl Descriptor {
    #[cfg(unix)]
    fn open(stream: i64) -> Option<Self> {
        use std::os::unix::io::FromRawFd;
        let fd = i32::try_from(stream).ok().filter(|fd| *fd >= 0)?;
        // /dev/fd has an entry for every open descriptor
        std::fs::metadata(format!("/dev/fd/{}", fd)).ok()?;
        // SAFETY: fd is open, and ManuallyDrop keeps the File from closing it
        let file = unsafe { File::from_raw_fd(fd) };
        Some(Self(ManuallyDrop::new(file)))
    }

    #[cfg(not(unix))]
    fn open(_stream: i64) -> Option<Self> {
        None
    }
}

impl Write for Descriptor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
