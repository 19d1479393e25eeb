//! Little-endian field reading shared by the binary formats.

use std::fmt;
use std::io::{self, BufRead, ErrorKind, Write};

use thiserror::Error;

/// Upper bound on pre-allocation driven by counts read from a file.
pub(crate) const MAX_PREALLOC: usize = 1 << 16;

/// Where in a file a decode failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Header,
    Record(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Header => write!(f, "header"),
            Location::Record(i) => write!(f, "record {i}"),
        }
    }
}

/// Errors produced while decoding a binary stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{location}: unexpected end of input while reading {field}")]
    Truncated {
        location: Location,
        field: &'static str,
    },
    #[error("{location}: {field} is not valid UTF-8")]
    InvalidText {
        location: Location,
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    pub fn location(&self) -> Option<Location> {
        match self {
            DecodeError::Truncated { location, .. } | DecodeError::InvalidText { location, .. } => {
                Some(*location)
            }
            DecodeError::Io(_) => None,
        }
    }
}

/// Reads fixed-width little-endian fields, tagging failures with the record
/// currently being decoded.
pub(crate) struct FieldReader<R> {
    inner: R,
    location: Location,
}

impl<R: BufRead> FieldReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            location: Location::Header,
        }
    }

    pub fn enter_record(&mut self, index: usize) {
        self.location = Location::Record(index);
    }

    pub fn location(&self) -> Location {
        self.location
    }

    fn map_err(&self, field: &'static str, err: io::Error) -> DecodeError {
        if err.kind() == ErrorKind::UnexpectedEof {
            DecodeError::Truncated {
                location: self.location,
                field,
            }
        } else {
            DecodeError::Io(err)
        }
    }

    pub fn bytes<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.map_err(field, e))?;
        Ok(buf)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.bytes::<1>(field)?[0])
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.bytes(field).map(u32::from_le_bytes)
    }

    pub fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.bytes(field).map(u64::from_le_bytes)
    }

    pub fn i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.bytes(field).map(i64::from_le_bytes)
    }

    pub fn f64(&mut self, field: &'static str) -> Result<f64, DecodeError> {
        self.bytes(field).map(f64::from_le_bytes)
    }

    pub fn f64s<const N: usize>(&mut self, field: &'static str) -> Result<[f64; N], DecodeError> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.f64(field)?;
        }
        Ok(out)
    }

    /// Read a zero-terminated UTF-8 string; the terminator is consumed.
    pub fn nul_terminated(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let mut buf = Vec::new();
        self.inner
            .read_until(0, &mut buf)
            .map_err(|e| self.map_err(field, e))?;
        if buf.pop() != Some(0) {
            return Err(DecodeError::Truncated {
                location: self.location,
                field,
            });
        }
        String::from_utf8(buf).map_err(|e| DecodeError::InvalidText {
            location: self.location,
            field,
            source: e.utf8_error(),
        })
    }

    /// Fill `buf` as far as the input allows and return how many bytes were
    /// read. Fewer than `buf.len()` means end of input.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }
        Ok(filled)
    }
}

pub(crate) fn write_f64s<W: Write>(writer: &mut W, values: &[f64]) -> io::Result<()> {
    for v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}
