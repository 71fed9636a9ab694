//! `tokio_util::codec` adapter for the stream decoders.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::{Frame, FramingProfile};
use crate::decoder::{DecodeStats, StreamDecoder};
use crate::error::{FrameError, Result};

/// Decodes frames from an `AsyncRead` via `FramedRead`.
///
/// Items are per-frame results so recoverable faults do not terminate the
/// stream; only I/O errors surface as the stream's error.
pub struct TelemetryCodec {
    decoder: Box<dyn StreamDecoder>,
}

impl TelemetryCodec {
    pub fn new(profile: FramingProfile) -> Self {
        Self {
            decoder: profile.decoder(),
        }
    }

    /// Abandon the in-progress frame after a read timeout.
    pub fn abort(&mut self) -> Option<FrameError> {
        self.decoder.abort()
    }

    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }
}

impl Decoder for TelemetryCodec {
    type Item = Result<Frame>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(result) = self.decoder.take_ready() {
            return Ok(Some(result));
        }
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(result) = self.decoder.push(byte) {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        Ok(self.decoder.abort().map(Err))
    }
}
