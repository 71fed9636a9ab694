//! Byte sources feeding the sensorlink decoder.
//!
//! Every source honors the same contract: a read either returns bytes,
//! reports that the read timeout elapsed, or reports that the source is
//! closed. Nothing blocks forever.
//!
//! This is the lowest layer of sensorlink. The frame decoder builds on the
//! [`ByteSource`] trait provided here.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, SourceError};
pub use traits::{ByteSource, ReadOutcome, ReaderSource};

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort};
