//! Frame type tags and the fixed payload width each one implies.
//!
//! The type byte following the header is the sole authority for how many
//! payload bytes the decoder consumes.

/// Frame start sentinel.
pub const HEADER: u8 = 0xAA;

/// Single ECG sample, 2-byte payload.
pub const ECG: u8 = 0x04;

/// Accelerometer X axis, 4-byte float payload.
pub const ACCEL_X: u8 = 0x11;
/// Accelerometer Y axis, 4-byte float payload.
pub const ACCEL_Y: u8 = 0x12;
/// Accelerometer Z axis, 4-byte float payload.
pub const ACCEL_Z: u8 = 0x13;

/// Gyroscope X axis, 4-byte float payload.
pub const GYRO_X: u8 = 0x21;
/// Gyroscope Y axis, 4-byte float payload.
pub const GYRO_Y: u8 = 0x22;
/// Gyroscope Z axis, 4-byte float payload.
pub const GYRO_Z: u8 = 0x23;

/// Temperature, 4-byte float payload.
pub const TEMP: u8 = 0x31;

/// Payload width of ECG frames.
pub const ECG_PAYLOAD_LEN: usize = 2;

/// Payload width of float-typed frames.
pub const FLOAT_PAYLOAD_LEN: usize = 4;

/// One axis of a three-axis sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in wire field order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position of this axis in `x, y, z` order.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Which three-axis sensor a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Accel,
    Gyro,
}

impl Domain {
    pub fn name(self) -> &'static str {
        match self {
            Domain::Accel => "accel",
            Domain::Gyro => "gyro",
        }
    }
}

/// Payload kind of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Ecg,
    AccelAxis(Axis),
    GyroAxis(Axis),
    Temperature,
}

impl FrameType {
    /// Every recognized frame type.
    pub const ALL: [FrameType; 8] = [
        FrameType::Ecg,
        FrameType::AccelAxis(Axis::X),
        FrameType::AccelAxis(Axis::Y),
        FrameType::AccelAxis(Axis::Z),
        FrameType::GyroAxis(Axis::X),
        FrameType::GyroAxis(Axis::Y),
        FrameType::GyroAxis(Axis::Z),
        FrameType::Temperature,
    ];

    /// Classify a type byte. Returns `None` for unrecognized tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            ECG => FrameType::Ecg,
            ACCEL_X => FrameType::AccelAxis(Axis::X),
            ACCEL_Y => FrameType::AccelAxis(Axis::Y),
            ACCEL_Z => FrameType::AccelAxis(Axis::Z),
            GYRO_X => FrameType::GyroAxis(Axis::X),
            GYRO_Y => FrameType::GyroAxis(Axis::Y),
            GYRO_Z => FrameType::GyroAxis(Axis::Z),
            TEMP => FrameType::Temperature,
            _ => return None,
        };
        Some(kind)
    }

    /// The wire type byte.
    pub fn tag(self) -> u8 {
        match self {
            FrameType::Ecg => ECG,
            FrameType::AccelAxis(Axis::X) => ACCEL_X,
            FrameType::AccelAxis(Axis::Y) => ACCEL_Y,
            FrameType::AccelAxis(Axis::Z) => ACCEL_Z,
            FrameType::GyroAxis(Axis::X) => GYRO_X,
            FrameType::GyroAxis(Axis::Y) => GYRO_Y,
            FrameType::GyroAxis(Axis::Z) => GYRO_Z,
            FrameType::Temperature => TEMP,
        }
    }

    /// Exact payload width in bytes.
    pub fn payload_len(self) -> usize {
        match self {
            FrameType::Ecg => ECG_PAYLOAD_LEN,
            FrameType::AccelAxis(_) | FrameType::GyroAxis(_) | FrameType::Temperature => {
                FLOAT_PAYLOAD_LEN
            }
        }
    }

    /// Construct the axis frame type for a domain.
    pub fn axis(domain: Domain, axis: Axis) -> Self {
        match domain {
            Domain::Accel => FrameType::AccelAxis(axis),
            Domain::Gyro => FrameType::GyroAxis(axis),
        }
    }

    /// Human-readable name for logs and output.
    pub fn name(self) -> &'static str {
        match self {
            FrameType::Ecg => "ECG",
            FrameType::AccelAxis(Axis::X) => "ACCEL_X",
            FrameType::AccelAxis(Axis::Y) => "ACCEL_Y",
            FrameType::AccelAxis(Axis::Z) => "ACCEL_Z",
            FrameType::GyroAxis(Axis::X) => "GYRO_X",
            FrameType::GyroAxis(Axis::Y) => "GYRO_Y",
            FrameType::GyroAxis(Axis::Z) => "GYRO_Z",
            FrameType::Temperature => "TEMP",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in FrameType::ALL {
            assert_eq!(FrameType::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn header_is_not_a_type() {
        assert_eq!(FrameType::from_tag(HEADER), None);
        assert_eq!(FrameType::from_tag(0x00), None);
        assert_eq!(FrameType::from_tag(0x14), None);
    }

    #[test]
    fn payload_widths() {
        assert_eq!(FrameType::Ecg.payload_len(), 2);
        assert_eq!(FrameType::Temperature.payload_len(), 4);
        assert_eq!(FrameType::GyroAxis(Axis::Z).payload_len(), 4);
    }
}
