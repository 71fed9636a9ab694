//! Decode loop drivers.
//!
//! Two scheduling models share the same per-frame path
//! ([`Bridge::handle_frame`]):
//! - [`run_polling`]: read, decode and forward on the calling thread.
//! - [`run_threaded`]: a reader thread pushes raw chunks into a bounded
//!   queue, blocking when it is full; the calling thread decodes and
//!   forwards. Nothing is ever dropped to relieve backpressure.
//!
//! Both stop when the shared flag is set or the source closes. Queued bytes
//! are discarded on stop and a partial frame is never emitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use sensorlink_frame::{DecodeStats, Frame, FrameError, FrameReader, FramingProfile, Reading};
use sensorlink_source::{ByteSource, ReadOutcome, SourceError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::aggregator::{EcgPairer, SampleAggregator};
use crate::config::{BridgeConfig, RunMode};
use crate::encoder::{encode, EcgLayout, OutboundPacket};
use crate::error::{BridgeError, Result};
use crate::forwarder::{DatagramSink, UdpForwarder};
use crate::sample::Telemetry;

const READ_CHUNK_SIZE: usize = 256;

/// Turns decoded readings into outbound packets.
///
/// Holds every piece of per-stream state between frames: the axis buffers
/// and, in paired ECG layout, the pending first sample.
#[derive(Debug, Clone, Default)]
pub struct PacketAssembler {
    aggregator: SampleAggregator,
    pairer: Option<EcgPairer>,
}

impl PacketAssembler {
    pub fn new(layout: EcgLayout) -> Self {
        Self::with_aggregator(SampleAggregator::new(), layout)
    }

    pub fn with_aggregator(aggregator: SampleAggregator, layout: EcgLayout) -> Self {
        let pairer = match layout {
            EcgLayout::Passthrough => None,
            EcgLayout::Paired => Some(EcgPairer::new()),
        };
        Self { aggregator, pairer }
    }

    /// Build from the aggregation settings of a config.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut aggregator = SampleAggregator::new();
        if let Some(bound) = config.stale_after() {
            aggregator = aggregator.with_stale_after(bound);
        }
        Self::with_aggregator(aggregator, config.ecg_layout)
    }

    /// Feed one reading. Returns a packet when a complete unit is ready.
    pub fn assemble(&mut self, reading: Reading) -> Option<OutboundPacket> {
        let telemetry = match (self.aggregator.push(reading)?, self.pairer.as_mut()) {
            (Telemetry::Ecg(sample), Some(pairer)) => Telemetry::EcgPair(pairer.push(sample)?),
            (other, _) => other,
        };
        Some(encode(&telemetry))
    }

    pub fn aggregator(&self) -> &SampleAggregator {
        &self.aggregator
    }

    pub fn layout(&self) -> EcgLayout {
        if self.pairer.is_some() {
            EcgLayout::Paired
        } else {
            EcgLayout::Passthrough
        }
    }
}

/// Counters for one bridge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Frames decoded.
    pub frames: u64,
    /// Datagrams handed to the sink.
    pub packets_sent: u64,
    /// Datagrams dropped because the sink was unavailable.
    pub send_failures: u64,
    /// Frames rejected or abandoned by the decoder.
    pub decode_faults: u64,
    /// Idle read timeouts.
    pub timeouts: u64,
    /// Partial axis sets dropped as stale.
    pub stale_discards: u64,
    /// Decoder counters.
    pub decode: DecodeStats,
}

impl BridgeStats {
    /// Count one recovered fault.
    ///
    /// Sync losses only skip bytes and are left to `decode.sync_losses`,
    /// so `decode_faults` agrees with [`DecodeStats::faults`].
    pub fn record_fault(&mut self, err: &FrameError) {
        match err {
            FrameError::Timeout => self.timeouts += 1,
            FrameError::SyncLost { .. } => {}
            _ => self.decode_faults += 1,
        }
    }

    fn log_summary(&self) {
        info!(
            frames = self.frames,
            packets_sent = self.packets_sent,
            send_failures = self.send_failures,
            decode_faults = self.decode_faults,
            bytes_discarded = self.decode.bytes_discarded,
            checksum_mismatches = self.decode.checksum_mismatches,
            "bridge stopped"
        );
    }
}

/// Aggregate, encode and send, one frame at a time.
pub struct Bridge<K> {
    assembler: PacketAssembler,
    sink: K,
    stats: BridgeStats,
    sink_down: bool,
}

impl<K: DatagramSink> Bridge<K> {
    /// A bridge with default aggregation and passthrough ECG.
    pub fn new(sink: K) -> Self {
        Self::with_assembler(sink, PacketAssembler::default())
    }

    pub fn with_assembler(sink: K, assembler: PacketAssembler) -> Self {
        Self {
            assembler,
            sink,
            stats: BridgeStats::default(),
            sink_down: false,
        }
    }

    pub fn from_config(config: &BridgeConfig, sink: K) -> Self {
        Self::with_assembler(sink, PacketAssembler::from_config(config))
    }

    /// Process one decoded frame. Returns bytes sent if a packet went out.
    pub fn handle_frame(&mut self, frame: &Frame) -> Option<usize> {
        self.stats.frames += 1;
        trace!(kind = frame.kind().name(), "frame");
        self.handle_reading(frame.reading())
    }

    /// Process one reading that did not come from a frame.
    pub fn handle_reading(&mut self, reading: Reading) -> Option<usize> {
        let packet = self.assembler.assemble(reading)?;
        match self.sink.send(&packet) {
            Ok(sent) => {
                self.stats.packets_sent += 1;
                if self.sink_down {
                    info!(destination = %self.sink.destination(), "sink reachable again");
                    self.sink_down = false;
                }
                Some(sent)
            }
            Err(err) => {
                self.stats.send_failures += 1;
                if self.sink_down {
                    debug!(label = ?packet.label(), error = %err, "packet dropped");
                } else {
                    warn!(label = ?packet.label(), error = %err, "packet dropped");
                    self.sink_down = true;
                }
                None
            }
        }
    }

    /// Count a fault the decoder recovered from.
    pub fn handle_fault(&mut self, err: &FrameError) {
        self.stats.record_fault(err);
        match err {
            FrameError::Timeout => trace!("read timeout"),
            other => debug!(error = %other, "decode fault"),
        }
    }

    /// Route one decoder result. Non-recoverable errors are returned.
    fn dispatch(&mut self, result: sensorlink_frame::Result<Frame>) -> Result<()> {
        match result {
            Ok(frame) => {
                self.handle_frame(&frame);
                Ok(())
            }
            Err(err) if err.is_recoverable() => {
                self.handle_fault(&err);
                Ok(())
            }
            Err(FrameError::Source(err)) => Err(BridgeError::Source(err)),
            Err(err) => Err(err.into()),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            stale_discards: self.assembler.aggregator().stale_discards(),
            ..self.stats
        }
    }

    pub fn assembler(&self) -> &PacketAssembler {
        &self.assembler
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    fn finish(&mut self, decode: DecodeStats) -> BridgeStats {
        self.stats.decode = decode;
        let stats = self.stats();
        stats.log_summary();
        stats
    }
}

impl<K> std::fmt::Debug for Bridge<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("layout", &self.assembler.layout())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Open the configured source and forwarder and run until stopped.
///
/// Failing to open the source is fatal. Once running, decode faults and
/// send failures are counted and the loop carries on.
pub fn run(config: &BridgeConfig, stop: &AtomicBool) -> Result<BridgeStats> {
    config.validate()?;
    let source = config.open_source()?;
    let forwarder = UdpForwarder::bind(config.destination)?;
    let mut bridge = Bridge::from_config(config, forwarder);

    info!(
        source = source.name(),
        destination = %config.destination,
        profile = %config.profile,
        mode = %config.mode,
        "bridge starting"
    );

    match config.mode {
        RunMode::Polling => {
            let mut reader = FrameReader::new(source, config.profile);
            run_polling(&mut reader, &mut bridge, stop)
        }
        RunMode::Threaded => run_threaded(
            source,
            config.profile,
            &mut bridge,
            config.queue_capacity,
            config.read_timeout(),
            stop,
        ),
    }
}

/// Single-threaded loop: each iteration reads, decodes and forwards.
///
/// The stop flag is checked between reads, so shutdown latency is bounded
/// by the source's read timeout.
pub fn run_polling<S: ByteSource, K: DatagramSink>(
    reader: &mut FrameReader<S>,
    bridge: &mut Bridge<K>,
    stop: &AtomicBool,
) -> Result<BridgeStats> {
    while !stop.load(Ordering::SeqCst) {
        match reader.read_frame() {
            Err(FrameError::SourceClosed) => {
                info!(source = reader.get_ref().name(), "source closed");
                break;
            }
            result => bridge.dispatch(result)?,
        }
    }
    Ok(bridge.finish(*reader.stats()))
}

enum SourceEvent {
    Data(Bytes),
    Timeout,
    Closed,
    Failed(SourceError),
}

/// Producer/consumer loop over a bounded queue of `capacity` chunks.
///
/// The reader thread owns the source and releases it when it exits. The
/// calling thread decodes; `poll_interval` bounds how long it waits on an
/// empty queue before rechecking the stop flag.
pub fn run_threaded<S, K>(
    source: S,
    profile: FramingProfile,
    bridge: &mut Bridge<K>,
    capacity: usize,
    poll_interval: Duration,
    stop: &AtomicBool,
) -> Result<BridgeStats>
where
    S: ByteSource + 'static,
    K: DatagramSink,
{
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let producer_stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&producer_stop);
    let producer = thread::Builder::new()
        .name("sensorlink-source".to_string())
        .spawn(move || produce(source, tx, &flag))
        .map_err(BridgeError::Spawn)?;

    let mut decoder = profile.decoder();
    let mut outcome = Ok(());

    while !stop.load(Ordering::SeqCst) {
        let event = match rx.recv_timeout(poll_interval) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match event {
            SourceEvent::Data(chunk) => {
                for byte in chunk {
                    let mut next = decoder.push(byte);
                    while let Some(result) = next {
                        if let Err(err) = bridge.dispatch(result) {
                            outcome = Err(err);
                            break;
                        }
                        next = decoder.take_ready();
                    }
                    if outcome.is_err() {
                        break;
                    }
                }
                if outcome.is_err() {
                    break;
                }
            }
            SourceEvent::Timeout => {
                let fault = decoder.abort().unwrap_or(FrameError::Timeout);
                bridge.handle_fault(&fault);
            }
            SourceEvent::Closed => {
                if let Some(fault) = decoder.abort() {
                    bridge.handle_fault(&fault);
                }
                info!("source closed");
                break;
            }
            SourceEvent::Failed(err) => {
                outcome = Err(BridgeError::Source(err));
                break;
            }
        }
    }

    // Unblock the producer: a full queue makes its send fail once the
    // receiver is gone, and the flag ends its read loop.
    producer_stop.store(true, Ordering::SeqCst);
    drop(rx);
    if producer.join().is_err() {
        return Err(BridgeError::WorkerPanicked);
    }

    outcome?;
    Ok(bridge.finish(*decoder.stats()))
}

fn produce<S: ByteSource>(mut source: S, tx: SyncSender<SourceEvent>, stop: &AtomicBool) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    debug!(source = source.name(), "reader thread started");

    while !stop.load(Ordering::SeqCst) {
        let event = match source.read_bytes(&mut chunk) {
            Ok(ReadOutcome::Data(n)) => SourceEvent::Data(Bytes::copy_from_slice(&chunk[..n])),
            Ok(ReadOutcome::Timeout) => SourceEvent::Timeout,
            Ok(ReadOutcome::Closed) => SourceEvent::Closed,
            Err(err) => SourceEvent::Failed(err),
        };
        let last = matches!(event, SourceEvent::Closed | SourceEvent::Failed(_));
        if tx.send(event).is_err() || last {
            break;
        }
    }

    debug!(source = source.name(), "reader thread exiting");
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::net::UdpSocket;

    use bytes::BytesMut;
    use sensorlink_frame::{encode_reading, Axis, Domain, EcgSample};
    use sensorlink_source::ReaderSource;

    use super::*;
    use crate::config::SourceConfig;
    use crate::error::ForwardError;

    #[derive(Default)]
    struct MemorySink {
        packets: Vec<OutboundPacket>,
    }

    impl DatagramSink for MemorySink {
        fn send(&mut self, packet: &OutboundPacket) -> std::result::Result<usize, ForwardError> {
            self.packets.push(packet.clone());
            Ok(packet.len())
        }

        fn destination(&self) -> String {
            "memory".to_string()
        }
    }

    struct DownSink {
        attempts: usize,
    }

    impl DatagramSink for DownSink {
        fn send(&mut self, _packet: &OutboundPacket) -> std::result::Result<usize, ForwardError> {
            self.attempts += 1;
            Err(ForwardError::SinkUnavailable {
                destination: "127.0.0.1:9".parse().unwrap(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            })
        }

        fn destination(&self) -> String {
            "127.0.0.1:9".to_string()
        }
    }

    fn wire(readings: &[Reading]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for reading in readings {
            encode_reading(reading, &mut buf);
        }
        buf.to_vec()
    }

    fn one_cycle() -> Vec<Reading> {
        vec![
            Reading::Ecg(EcgSample::from_raw(0x0123)),
            Reading::Temperature(10.0),
            Reading::axis(Domain::Accel, Axis::Y, 2.0),
            Reading::axis(Domain::Accel, Axis::Z, 3.0),
            Reading::axis(Domain::Accel, Axis::X, 1.0),
            Reading::axis(Domain::Gyro, Axis::X, 10.0),
            Reading::axis(Domain::Gyro, Axis::Y, 20.0),
            Reading::axis(Domain::Gyro, Axis::Z, 30.0),
        ]
    }

    fn labels(sink: &MemorySink) -> Vec<u8> {
        sink.packets.iter().map(|p| p.as_bytes()[0]).collect()
    }

    #[test]
    fn handle_frame_forwards_complete_units() {
        let mut bridge = Bridge::new(MemorySink::default());
        for reading in one_cycle() {
            bridge.handle_frame(&Frame::from_reading(&reading));
        }

        assert_eq!(labels(bridge.sink()), vec![0, 1, 3, 2]);
        assert_eq!(
            bridge.sink().packets[1].as_bytes(),
            &[0x01, 0x00, 0x00, 0x20, 0x41]
        );
        let stats = bridge.stats();
        assert_eq!(stats.frames, 8);
        assert_eq!(stats.packets_sent, 4);
    }

    #[test]
    fn polling_skips_garbage_and_stops_on_close() {
        let mut bytes = vec![0x00, 0x13, 0xFF];
        bytes.extend(wire(&one_cycle()));
        bytes.extend([0xAA, 0x31, 0x00, 0x00, 0x20, 0x41, 0xC8]);
        bytes.extend(wire(&[Reading::Temperature(11.0)]));

        let mut reader = FrameReader::new(
            ReaderSource::new(Cursor::new(bytes)),
            FramingProfile::Headered,
        );
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = AtomicBool::new(false);

        let stats = run_polling(&mut reader, &mut bridge, &stop).unwrap();

        assert_eq!(labels(bridge.sink()), vec![0, 1, 3, 2, 1]);
        assert_eq!(stats.frames, 9);
        assert_eq!(stats.decode.checksum_mismatches, 1);
        // Leading garbage plus the six bytes rescanned after the bad frame.
        assert_eq!(stats.decode.bytes_discarded, 9);
        assert_eq!(stats.decode.sync_losses, 2);
        assert_eq!(stats.decode_faults, 1);
        assert_eq!(stats.decode_faults, stats.decode.faults());
    }

    #[test]
    fn polling_honors_preset_stop() {
        let mut reader = FrameReader::new(
            ReaderSource::new(Cursor::new(wire(&one_cycle()))),
            FramingProfile::Headered,
        );
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = AtomicBool::new(true);

        let stats = run_polling(&mut reader, &mut bridge, &stop).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(bridge.sink().packets.is_empty());
    }

    #[test]
    fn send_failures_do_not_stop_the_loop() {
        let mut reader = FrameReader::new(
            ReaderSource::new(Cursor::new(wire(&one_cycle()))),
            FramingProfile::Headered,
        );
        let mut bridge = Bridge::new(DownSink { attempts: 0 });
        let stop = AtomicBool::new(false);

        let stats = run_polling(&mut reader, &mut bridge, &stop).unwrap();
        assert_eq!(stats.frames, 8);
        assert_eq!(stats.send_failures, 4);
        assert_eq!(stats.packets_sent, 0);
        assert_eq!(bridge.sink().attempts, 4);
    }

    #[test]
    fn paired_layout_halves_ecg_packets() {
        let readings: Vec<Reading> = (0..5)
            .map(|i| Reading::Ecg(EcgSample::from_value(100 + i)))
            .collect();
        let mut bridge = Bridge::with_assembler(
            MemorySink::default(),
            PacketAssembler::new(EcgLayout::Paired),
        );
        for reading in readings {
            bridge.handle_reading(reading);
        }

        let packets = &bridge.sink().packets;
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].as_bytes(), &[0x00, 0x00, 100, 0x00, 101]);
        assert_eq!(bridge.assembler().layout(), EcgLayout::Paired);
    }

    #[test]
    fn threaded_matches_polling_under_backpressure() {
        let mut bytes = Vec::new();
        for _ in 0..20 {
            bytes.extend(wire(&one_cycle()));
        }

        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));
        let source = ReaderSource::new(Cursor::new(bytes));

        let stats = run_threaded(
            source,
            FramingProfile::Headered,
            &mut bridge,
            1,
            Duration::from_millis(50),
            &stop,
        )
        .unwrap();

        assert_eq!(stats.frames, 160);
        assert_eq!(stats.packets_sent, 80);
        assert_eq!(labels(bridge.sink())[..4], [0, 1, 3, 2]);
    }

    #[test]
    fn threaded_timeout_abandons_partial_frame() {
        let tail = wire(&[Reading::Temperature(2.0)]);
        let source = ScriptedSource::new(vec![
            Step::Data(vec![0xAA, 0x31, 0x00]),
            Step::Timeout,
            Step::Data(tail),
        ]);
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));

        let stats = run_threaded(
            source,
            FramingProfile::Headered,
            &mut bridge,
            4,
            Duration::from_millis(50),
            &stop,
        )
        .unwrap();

        assert_eq!(stats.decode.incomplete_frames, 1);
        assert_eq!(stats.frames, 1);
        assert_eq!(
            OutboundPacket::parse(bridge.sink().packets[0].as_bytes()),
            Ok(Telemetry::Temperature(2.0))
        );
    }

    #[test]
    fn threaded_source_failure_is_returned() {
        let source = ScriptedSource::new(vec![Step::Fail]);
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));

        let err = run_threaded(
            source,
            FramingProfile::Headered,
            &mut bridge,
            4,
            Duration::from_millis(50),
            &stop,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Source(_)));
    }

    #[test]
    fn polling_source_failure_is_source_error() {
        let mut reader = FrameReader::new(
            ScriptedSource::new(vec![Step::Fail]),
            FramingProfile::Headered,
        );
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = AtomicBool::new(false);

        let err = run_polling(&mut reader, &mut bridge, &stop).unwrap_err();
        assert!(matches!(err, BridgeError::Source(_)));
    }

    #[test]
    fn threaded_leaves_caller_stop_flag_alone() {
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));
        let source = ReaderSource::new(Cursor::new(wire(&one_cycle())));

        let stats = run_threaded(
            source,
            FramingProfile::Headered,
            &mut bridge,
            4,
            Duration::from_millis(50),
            &stop,
        )
        .unwrap();

        assert_eq!(stats.frames, 8);
        assert!(!stop.load(Ordering::SeqCst));
    }

    #[test]
    fn threaded_recovers_frame_inside_rejected_frame() {
        // A stray header and temperature tag swallow a whole ECG frame.
        let mut bytes = vec![0xAA, 0x31];
        bytes.extend(wire(&[
            Reading::Ecg(EcgSample::from_raw(0x0123)),
            Reading::Temperature(4.0),
        ]));
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));

        let stats = run_threaded(
            ReaderSource::new(Cursor::new(bytes)),
            FramingProfile::Headered,
            &mut bridge,
            4,
            Duration::from_millis(50),
            &stop,
        )
        .unwrap();

        assert_eq!(labels(bridge.sink()), vec![0, 1]);
        assert_eq!(bridge.sink().packets[0].as_bytes(), &[0x00, 0x01, 0x23]);
        assert_eq!(stats.decode.checksum_mismatches, 1);
        assert_eq!(stats.decode_faults, 1);
    }

    #[test]
    fn threaded_stop_flag_ends_idle_run() {
        let source = ScriptedSource::idle();
        let mut bridge = Bridge::new(MemorySink::default());
        let stop = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&stop);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        });

        let stats = run_threaded(
            source,
            FramingProfile::Headered,
            &mut bridge,
            4,
            Duration::from_millis(10),
            &stop,
        )
        .unwrap();
        stopper.join().unwrap();

        assert_eq!(stats.frames, 0);
        assert!(stats.timeouts > 0);
    }

    #[test]
    fn run_synthetic_to_udp() {
        for mode in [RunMode::Polling, RunMode::Threaded] {
            let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
            rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

            let config = BridgeConfig {
                source: SourceConfig::Synthetic {
                    interval_ms: None,
                    seed: Some(9),
                    garbage: true,
                    cycles: Some(3),
                },
                destination: rx.local_addr().unwrap(),
                mode,
                ..BridgeConfig::default()
            };
            let stop = Arc::new(AtomicBool::new(false));

            let stats = run(&config, &stop).unwrap();
            assert_eq!(stats.packets_sent, 12, "{mode}");

            let mut buf = [0u8; 64];
            let mut seen = Vec::new();
            for _ in 0..12 {
                let (n, _) = rx.recv_from(&mut buf).unwrap();
                seen.push(OutboundPacket::parse(&buf[..n]).unwrap().kind_name());
            }
            assert_eq!(seen.iter().filter(|k| **k == "accel").count(), 3);
            assert_eq!(seen.iter().filter(|k| **k == "gyro").count(), 3);
        }
    }

    #[test]
    fn run_fails_fast_on_missing_device() {
        let config = BridgeConfig {
            source: SourceConfig::Serial {
                device: "/dev/sensorlink-missing".into(),
                baud: 115_200,
            },
            ..BridgeConfig::default()
        };
        let stop = Arc::new(AtomicBool::new(false));
        assert!(run(&config, &stop).is_err());
    }

    enum Step {
        Data(Vec<u8>),
        Timeout,
        Fail,
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
        idle: bool,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                idle: false,
            }
        }

        /// Times out forever.
        fn idle() -> Self {
            Self {
                steps: VecDeque::new(),
                idle: true,
            }
        }
    }

    impl ByteSource for ScriptedSource {
        fn read_bytes(&mut self, buf: &mut [u8]) -> sensorlink_source::Result<ReadOutcome> {
            match self.steps.pop_front() {
                None if self.idle => {
                    thread::sleep(Duration::from_millis(5));
                    Ok(ReadOutcome::Timeout)
                }
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
