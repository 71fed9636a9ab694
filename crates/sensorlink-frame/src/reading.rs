use crate::frame_type::{Axis, Domain, FrameType};

/// Mask of the significant bits in an ECG sample.
pub const ECG_VALUE_MASK: u16 = 0x03FF;

/// One ECG sample as carried on the wire.
///
/// The raw 16-bit word is kept so the sample can be forwarded byte for
/// byte; [`EcgSample::value`] gives the 10-bit measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EcgSample(u16);

impl EcgSample {
    /// Wrap a raw wire word, unmasked.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Build a sample from a measurement, keeping only the low 10 bits.
    pub const fn from_value(value: u16) -> Self {
        Self(value & ECG_VALUE_MASK)
    }

    /// The raw wire word.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The 10-bit measurement.
    pub const fn value(self) -> u16 {
        self.0 & ECG_VALUE_MASK
    }
}

/// A single-axis float reading from the accelerometer or gyroscope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub domain: Domain,
    pub axis: Axis,
    pub value: f32,
}

/// A decoded value carried by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Ecg(EcgSample),
    Temperature(f32),
    Axis(AxisSample),
}

impl Reading {
    /// Convenience constructor for an axis reading.
    pub fn axis(domain: Domain, axis: Axis, value: f32) -> Self {
        Reading::Axis(AxisSample {
            domain,
            axis,
            value,
        })
    }

    /// Frame type that carries this reading.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Reading::Ecg(_) => FrameType::Ecg,
            Reading::Temperature(_) => FrameType::Temperature,
            Reading::Axis(sample) => FrameType::axis(sample.domain, sample.axis),
        }
    }

    /// Bit-exact equality: floats compare by IEEE-754 bit pattern.
    pub fn bits_eq(&self, other: &Reading) -> bool {
        match (self, other) {
            (Reading::Ecg(a), Reading::Ecg(b)) => a == b,
            (Reading::Temperature(a), Reading::Temperature(b)) => a.to_bits() == b.to_bits(),
            (Reading::Axis(a), Reading::Axis(b)) => {
                a.domain == b.domain && a.axis == b.axis && a.value.to_bits() == b.value.to_bits()
            }
            _ => false,
        }
    }
}
