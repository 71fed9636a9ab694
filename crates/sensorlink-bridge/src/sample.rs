use sensorlink_frame::{Domain, EcgSample};

/// A full three-axis reading assembled from single-axis frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CompositeSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Fields in wire order.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Two consecutive ECG samples sent as one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcgPair {
    pub v1: EcgSample,
    pub v2: EcgSample,
}

/// A complete unit of telemetry, ready for encoding.
///
/// Single axis readings never appear here; they only leave the aggregator
/// as part of a full [`CompositeSample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    Ecg(EcgSample),
    EcgPair(EcgPair),
    Temperature(f32),
    Composite {
        domain: Domain,
        sample: CompositeSample,
    },
}

impl Telemetry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Telemetry::Ecg(_) | Telemetry::EcgPair(_) => "ecg",
            Telemetry::Temperature(_) => "temperature",
            Telemetry::Composite { domain, .. } => domain.name(),
        }
    }
}
