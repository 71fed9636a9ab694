use sensorlink_source::SourceError;

/// Errors that can occur while decoding frames from a byte source.
///
/// Decode-time kinds are recovered locally by the decoder (it returns to
/// header scanning); see [`FrameError::is_recoverable`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Bytes were discarded while scanning for the next header.
    #[error("sync lost: discarded {discarded} bytes before next header")]
    SyncLost { discarded: usize },

    /// The type byte after a header is not a recognized frame type.
    #[error("unknown frame type 0x{0:02X}")]
    UnknownType(u8),

    /// The checksum byte does not match the frame contents.
    #[error("checksum mismatch on type 0x{type_tag:02X} (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch { type_tag: u8, expected: u8, actual: u8 },

    /// The source starved before the frame was fully read.
    #[error("incomplete frame: source starved after {received} bytes")]
    IncompleteFrame { type_tag: Option<u8>, received: usize },

    /// A payload does not have the width its frame type requires.
    #[error("payload length {actual} does not match type 0x{type_tag:02X} (expected {expected})")]
    PayloadLength {
        type_tag: u8,
        expected: usize,
        actual: usize,
    },

    /// The read timeout elapsed while scanning for a header.
    #[error("read timed out")]
    Timeout,

    /// The byte source is closed; no further frames will arrive.
    #[error("source closed")]
    SourceClosed,

    /// The byte source failed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
}

impl FrameError {
    /// True for faults the decode loop absorbs and continues past.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::SyncLost { .. }
                | FrameError::UnknownType(_)
                | FrameError::ChecksumMismatch { .. }
                | FrameError::IncompleteFrame { .. }
                | FrameError::Timeout
        )
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Source(SourceError::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
