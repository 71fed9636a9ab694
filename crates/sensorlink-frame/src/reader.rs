use bytes::{Buf, BytesMut};
use sensorlink_source::{ByteSource, ReadOutcome};

use crate::codec::{Frame, FramingProfile};
use crate::decoder::{DecodeStats, StreamDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Reads frames from any [`ByteSource`].
///
/// Handles partial reads internally. A source timeout or close in the
/// middle of a frame abandons that frame and reports `IncompleteFrame`;
/// a timeout while idle reports `Timeout` so callers can poll a stop flag.
///
/// The frame sequence is lazy and non-restartable: each call advances the
/// stream position.
pub struct FrameReader<S> {
    source: S,
    decoder: Box<dyn StreamDecoder>,
    buf: BytesMut,
    closed: bool,
    finished: bool,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a reader decoding `profile` frames from `source`.
    pub fn new(source: S, profile: FramingProfile) -> Self {
        Self::with_decoder(source, profile.decoder())
    }

    /// Create a reader with an explicit decoder.
    pub fn with_decoder(source: S, decoder: Box<dyn StreamDecoder>) -> Self {
        Self {
            source,
            decoder,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            closed: false,
            finished: false,
        }
    }

    /// Read the next frame or decode fault.
    ///
    /// Returns `Err(FrameError::SourceClosed)` once the source is exhausted
    /// and every buffered byte has been decoded.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(result) = self.decoder.take_ready() {
                return result;
            }
            while self.buf.has_remaining() {
                let byte = self.buf.get_u8();
                if let Some(result) = self.decoder.push(byte) {
                    return result;
                }
            }

            if self.closed {
                return Err(FrameError::SourceClosed);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.source.read_bytes(&mut chunk)? {
                ReadOutcome::Data(n) => self.buf.extend_from_slice(&chunk[..n]),
                ReadOutcome::Timeout => {
                    return Err(self.decoder.abort().unwrap_or(FrameError::Timeout));
                }
                ReadOutcome::Closed => {
                    self.closed = true;
                    if let Some(err) = self.decoder.abort() {
                        return Err(err);
                    }
                    return Err(FrameError::SourceClosed);
                }
            }
        }
    }

    /// Decode counters so far.
    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    /// The active framing profile.
    pub fn profile(&self) -> FramingProfile {
        self.decoder.profile()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the source. Buffered bytes are dropped.
    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Yields every frame and recoverable fault, ending after the source closes.
impl<S: ByteSource> Iterator for FrameReader<S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Err(FrameError::SourceClosed) => {
                self.finished = true;
                None
            }
            other => Some(other),
        }
    }
}

impl<S> std::fmt::Debug for FrameReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("profile", &self.decoder.profile())
            .field("buffered", &self.buf.len())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;

    use sensorlink_source::{ReaderSource, SourceError};

    use super::*;
    use crate::codec::encode_reading;
    use crate::frame_type::{Axis, Domain};
    use crate::prefix::{encode_prefixed, PrefixKind};
    use crate::reading::{EcgSample, Reading};

    fn cursor_reader(bytes: Vec<u8>) -> FrameReader<ReaderSource<Cursor<Vec<u8>>>> {
        FrameReader::new(ReaderSource::new(Cursor::new(bytes)), FramingProfile::Headered)
    }

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_reading(&Reading::Temperature(10.0), &mut wire);

        let mut reader = cursor_reader(wire.to_vec());
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.reading(), Reading::Temperature(10.0));
        assert!(matches!(reader.read_frame(), Err(FrameError::SourceClosed)));
    }

    #[test]
    fn iterator_ends_after_close() {
        let mut wire = BytesMut::new();
        encode_reading(&Reading::axis(Domain::Accel, Axis::X, 1.0), &mut wire);
        encode_reading(&Reading::axis(Domain::Accel, Axis::Y, 2.0), &mut wire);

        let readings: Vec<Reading> = cursor_reader(wire.to_vec())
            .map(|r| r.unwrap().reading())
            .collect();

        assert_eq!(readings.len(), 2);
    }

    #[test]
    fn close_mid_frame_reports_incomplete_then_closed() {
        let mut reader = cursor_reader(vec![0xAA, 0x31, 0x00, 0x00]);

        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::IncompleteFrame {
                type_tag: Some(0x31),
                received: 4
            })
        ));
        assert!(matches!(reader.read_frame(), Err(FrameError::SourceClosed)));
        assert_eq!(reader.stats().incomplete_frames, 1);
    }

    #[test]
    fn timeout_mid_frame_aborts_and_later_frame_decodes() {
        let mut tail = BytesMut::new();
        encode_reading(&Reading::Temperature(2.0), &mut tail);

        let source = ScriptedSource::new(vec![
            Step::Data(vec![0xAA, 0x13, 0x01]),
            Step::Timeout,
            // Rest of the starved frame arrives late and must be ignored.
            Step::Data(vec![0x02, 0x03, 0xFF]),
            Step::Data(tail.to_vec()),
        ]);
        let mut reader = FrameReader::new(source, FramingProfile::Headered);

        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::IncompleteFrame { .. })
        ));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::SyncLost { discarded: 3 })
        ));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.reading(), Reading::Temperature(2.0));
        assert!(matches!(reader.read_frame(), Err(FrameError::SourceClosed)));
    }

    #[test]
    fn frames_recovered_from_rejected_bytes_come_out_in_order() {
        let mut wire = BytesMut::from(&[0xAA, 0x31][..]);
        encode_reading(&Reading::Ecg(EcgSample::from_raw(0x0123)), &mut wire);
        encode_reading(&Reading::Temperature(4.0), &mut wire);

        let results: Vec<Result<Frame>> = cursor_reader(wire.to_vec()).collect();

        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[0],
            Err(FrameError::ChecksumMismatch { type_tag: 0x31, .. })
        ));
        assert!(matches!(results[1], Err(FrameError::SyncLost { discarded: 1 })));
        assert_eq!(
            results[2].as_ref().unwrap().reading(),
            Reading::Ecg(EcgSample::from_raw(0x0123))
        );
        assert_eq!(results[3].as_ref().unwrap().reading(), Reading::Temperature(4.0));
    }

    #[test]
    fn idle_timeout_is_reported() {
        let source = ScriptedSource::new(vec![Step::Timeout]);
        let mut reader = FrameReader::new(source, FramingProfile::Headered);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Timeout));
        assert!(err.is_recoverable());
    }

    #[test]
    fn source_error_is_not_recoverable() {
        let source = ScriptedSource::new(vec![Step::Fail]);
        let mut reader = FrameReader::new(source, FramingProfile::Headered);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Source(SourceError::Io(_))));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn byte_by_byte_source() {
        let mut wire = BytesMut::new();
        encode_reading(&Reading::axis(Domain::Gyro, Axis::Z, -7.25), &mut wire);
        let steps = wire.iter().map(|b| Step::Data(vec![*b])).collect();

        let mut reader = FrameReader::new(ScriptedSource::new(steps), FramingProfile::Headered);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.reading(), Reading::axis(Domain::Gyro, Axis::Z, -7.25));
    }

    #[test]
    fn prefix_profile_reader() {
        let mut wire = BytesMut::new();
        encode_prefixed(PrefixKind::AccelSample, &[1.0, 2.0, 3.0], &mut wire);

        let reader = FrameReader::new(
            ReaderSource::new(Cursor::new(wire.to_vec())),
            FramingProfile::Prefix,
        );
        assert_eq!(reader.profile(), FramingProfile::Prefix);
        let frames: Vec<Frame> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(frames.len(), 3);
    }

    enum Step {
        Data(Vec<u8>),
        Timeout,
        Fail,
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl ByteSource for ScriptedSource {
        fn read_bytes(&mut self, buf: &mut [u8]) -> sensorlink_source::Result<ReadOutcome> {
            match self.steps.pop_front() {
                None => Ok(ReadOutcome::Closed),
                Some(Step::Timeout) => Ok(ReadOutcome::Timeout),
                Some(Step::Fail) => Err(SourceError::Io(std::io::Error::other("unplugged"))),
                Some(Step::Data(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(ReadOutcome::Data(bytes.len()))
                }
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
