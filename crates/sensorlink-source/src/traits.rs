use std::io::{ErrorKind, Read};

use crate::error::{Result, SourceError};

/// Result of a single bounded read from a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the buffer (`n > 0`).
    Data(usize),
    /// The read timeout elapsed with no bytes available.
    Timeout,
    /// The source reached end of stream and will not produce more bytes.
    Closed,
}

/// A supplier of raw bytes with a bounded-timeout read contract.
///
/// Implementations must never block longer than their configured read
/// timeout. A read that cannot produce bytes in time returns
/// [`ReadOutcome::Timeout`]; a source that is exhausted returns
/// [`ReadOutcome::Closed`] on every subsequent call.
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Short human-readable name for diagnostics.
    fn name(&self) -> &str;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        (**self).read_bytes(buf)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        (**self).read_bytes(buf)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Adapts any `Read` implementation (files, captures, pipes) to [`ByteSource`].
///
/// `Ok(0)` maps to `Closed`; `WouldBlock` and `TimedOut` map to `Timeout`.
/// Interrupted reads are retried.
pub struct ReaderSource<R> {
    inner: R,
    name: String,
    closed: bool,
}

impl<R: Read + Send> ReaderSource<R> {
    /// Wrap a reader with a generic name.
    pub fn new(inner: R) -> Self {
        Self::named(inner, "reader")
    }

    /// Wrap a reader with an explicit diagnostic name.
    pub fn named(inner: R, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
            closed: false,
        }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if self.closed {
            return Ok(ReadOutcome::Closed);
        }
        if buf.is_empty() {
            return Ok(ReadOutcome::Timeout);
        }
        loop {
            match self.inner.read(buf) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(ReadOutcome::Closed);
                }
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(ReadOutcome::Timeout)
                }
                Err(err) => return Err(SourceError::Io(err)),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<R> std::fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSource")
            .field("name", &self.name)
            .field("closed", &self.closed)
            .finish()
    }
}
