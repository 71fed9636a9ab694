//! Synthetic device stream for running without hardware.

use std::thread;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensorlink_source::{ByteSource, ReadOutcome};
use tracing::trace;

use crate::codec::{encode_reading, FramingProfile};
use crate::frame_type::{Axis, Domain, HEADER};
use crate::prefix::{encode_prefixed, PrefixKind};
use crate::reading::{EcgSample, Reading};

/// Settings for [`SyntheticSource`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Framing profile of the generated stream.
    pub profile: FramingProfile,
    /// Pause between cycles. `None` generates as fast as it is read.
    pub interval: Option<Duration>,
    /// Upper bound on a single read while waiting for the next cycle.
    pub read_timeout: Duration,
    /// Seed for reproducible streams. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Insert random noise bytes between frames.
    pub garbage: bool,
    /// Close the source after this many cycles.
    pub cycles: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            profile: FramingProfile::Headered,
            interval: None,
            read_timeout: Duration::from_secs(1),
            seed: None,
            garbage: false,
            cycles: None,
        }
    }
}

/// Generates the sensor board's byte stream with random readings.
///
/// Each cycle carries one ECG sample (headered profile only), one
/// temperature, and a full accelerometer and gyroscope triple.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    pending: BytesMut,
    next_due: Option<Instant>,
    cycles: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            pending: BytesMut::new(),
            next_due: None,
            cycles: 0,
        }
    }

    /// Number of cycles generated so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Draw the readings of one cycle, in stream order.
    pub fn next_cycle(&mut self) -> Vec<Reading> {
        let mut readings = Vec::with_capacity(8);
        if self.config.profile == FramingProfile::Headered {
            readings.push(Reading::Ecg(EcgSample::from_value(
                self.rng.gen_range(0..=1023),
            )));
        }
        readings.push(Reading::Temperature(round2(self.rng.gen_range(25.0..37.0))));
        for axis in Axis::ALL {
            let value = round2(self.rng.gen_range(-2.0..2.0));
            readings.push(Reading::axis(Domain::Accel, axis, value));
        }
        for axis in Axis::ALL {
            let value = round2(self.rng.gen_range(-250.0..250.0));
            readings.push(Reading::axis(Domain::Gyro, axis, value));
        }
        readings
    }

    /// Encode one cycle's readings into the pending buffer.
    fn encode_cycle(&mut self, readings: &[Reading]) {
        match self.config.profile {
            FramingProfile::Headered => {
                for reading in readings {
                    self.put_noise();
                    encode_reading(reading, &mut self.pending);
                }
            }
            FramingProfile::Prefix => {
                let mut accel = [0f32; 3];
                let mut gyro = [0f32; 3];
                for reading in readings {
                    match reading {
                        Reading::Temperature(v) => {
                            self.put_noise();
                            encode_prefixed(PrefixKind::Temperature, &[*v], &mut self.pending);
                        }
                        Reading::Axis(s) if s.domain == Domain::Accel => {
                            accel[s.axis.index()] = s.value
                        }
                        Reading::Axis(s) => gyro[s.axis.index()] = s.value,
                        Reading::Ecg(_) => {}
                    }
                }
                self.put_noise();
                encode_prefixed(PrefixKind::AccelSample, &accel, &mut self.pending);
                self.put_noise();
                encode_prefixed(PrefixKind::GyroSample, &gyro, &mut self.pending);
            }
        }
    }

    fn put_noise(&mut self) {
        if !self.config.garbage {
            return;
        }
        let count = self.rng.gen_range(0..=3);
        for _ in 0..count {
            let byte: u8 = self.rng.gen();
            if byte == HEADER || PrefixKind::from_byte(byte).is_some() {
                continue;
            }
            self.pending.extend_from_slice(&[byte]);
        }
    }

    /// Wait for the next cycle to become due without exceeding the read timeout.
    ///
    /// Returns false if the timeout elapsed first.
    fn wait_for_cycle(&mut self) -> bool {
        let Some(interval) = self.config.interval else {
            return true;
        };
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                let wait = due - now;
                if wait > self.config.read_timeout {
                    thread::sleep(self.config.read_timeout);
                    return false;
                }
                thread::sleep(wait);
            }
        }
        let base = self.next_due.map_or(now, |due| due.max(now));
        self.next_due = Some(base + interval);
        true
    }
}

impl ByteSource for SyntheticSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> sensorlink_source::Result<ReadOutcome> {
        if self.pending.is_empty() {
            if self.config.cycles.is_some_and(|max| self.cycles >= max) {
                return Ok(ReadOutcome::Closed);
            }
            if !self.wait_for_cycle() {
                return Ok(ReadOutcome::Timeout);
            }
            let readings = self.next_cycle();
            self.encode_cycle(&readings);
            self.cycles += 1;
            trace!(cycle = self.cycles, bytes = self.pending.len(), "generated cycle");
        }

        let n = buf.len().min(self.pending.len());
        if n == 0 {
            return Ok(ReadOutcome::Timeout);
        }
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(ReadOutcome::Data(n))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

fn round2(value: f64) -> f32 {
    ((value * 100.0).round() / 100.0) as f32
}
