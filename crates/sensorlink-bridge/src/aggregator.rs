//! Reassembly of single-axis readings into composite samples.

use std::time::{Duration, Instant};

use sensorlink_frame::{Axis, AxisSample, Domain, EcgSample, Reading};
use tracing::{debug, trace};

use crate::sample::{CompositeSample, EcgPair, Telemetry};

/// Pending X/Y/Z values of one domain.
#[derive(Debug, Default, Clone)]
struct AxisBuffer {
    values: [Option<f32>; 3],
    started: Option<Instant>,
}

impl AxisBuffer {
    /// Record one axis. Returns the composite once all three are present.
    fn write(&mut self, axis: Axis, value: f32, now: Instant) -> Option<CompositeSample> {
        if self.started.is_none() {
            self.started = Some(now);
        }
        self.values[axis.index()] = Some(value);

        if let [Some(x), Some(y), Some(z)] = self.values {
            self.clear();
            return Some(CompositeSample::new(x, y, z));
        }
        None
    }

    fn is_empty(&self) -> bool {
        self.started.is_none()
    }

    fn is_stale(&self, now: Instant, bound: Duration) -> bool {
        self.started
            .is_some_and(|started| now.saturating_duration_since(started) > bound)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Buffers accelerometer and gyroscope axes until each set is complete.
///
/// Axes may arrive in any order. A repeated axis overwrites the pending
/// value without completing the set, so a composite always carries the most
/// recent value of each axis. The two domains never mix.
///
/// Scalar readings (ECG, temperature) pass straight through.
#[derive(Debug, Default, Clone)]
pub struct SampleAggregator {
    accel: AxisBuffer,
    gyro: AxisBuffer,
    stale_after: Option<Duration>,
    stale_discards: u64,
}

impl SampleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard a partial set whose first axis is older than `bound`.
    ///
    /// Without a bound, a partial set waits indefinitely for its missing axes.
    pub fn with_stale_after(mut self, bound: Duration) -> Self {
        self.stale_after = Some(bound);
        self
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after
    }

    /// Feed one decoded reading.
    pub fn push(&mut self, reading: Reading) -> Option<Telemetry> {
        self.push_at(reading, Instant::now())
    }

    /// Feed one reading observed at `now`.
    pub fn push_at(&mut self, reading: Reading, now: Instant) -> Option<Telemetry> {
        match reading {
            Reading::Ecg(sample) => Some(Telemetry::Ecg(sample)),
            Reading::Temperature(value) => Some(Telemetry::Temperature(value)),
            Reading::Axis(AxisSample {
                domain,
                axis,
                value,
            }) => {
                let stale_after = self.stale_after;
                let buffer = self.buffer_mut(domain);
                if let Some(bound) = stale_after {
                    if buffer.is_stale(now, bound) {
                        buffer.clear();
                        self.stale_discards += 1;
                        debug!(domain = domain.name(), "discarded stale partial sample");
                    }
                }

                let sample = self.buffer_mut(domain).write(axis, value, now)?;
                trace!(domain = domain.name(), ?sample, "composite sample complete");
                Some(Telemetry::Composite { domain, sample })
            }
        }
    }

    /// Pending values of `domain` in X/Y/Z order.
    pub fn pending(&self, domain: Domain) -> [Option<f32>; 3] {
        self.buffer(domain).values
    }

    /// Whether any axis of `domain` is waiting for completion.
    pub fn has_pending(&self, domain: Domain) -> bool {
        !self.buffer(domain).is_empty()
    }

    /// Partial sets dropped for exceeding the staleness bound.
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    /// Drop every partial set.
    pub fn clear(&mut self) {
        self.accel.clear();
        self.gyro.clear();
    }

    fn buffer(&self, domain: Domain) -> &AxisBuffer {
        match domain {
            Domain::Accel => &self.accel,
            Domain::Gyro => &self.gyro,
        }
    }

    fn buffer_mut(&mut self, domain: Domain) -> &mut AxisBuffer {
        match domain {
            Domain::Accel => &mut self.accel,
            Domain::Gyro => &mut self.gyro,
        }
    }
}

/// Joins consecutive ECG samples into pairs.
#[derive(Debug, Default, Clone)]
pub struct EcgPairer {
    pending: Option<EcgSample>,
}

impl EcgPairer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a pair on every second sample.
    pub fn push(&mut self, sample: EcgSample) -> Option<EcgPair> {
        match self.pending.take() {
            Some(v1) => Some(EcgPair { v1, v2: sample }),
            None => {
                self.pending = Some(sample);
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
