//! Bridge a sensor board's serial telemetry to a UDP visualizer.
//!
//! The board streams single-axis readings in small checksummed frames.
//! sensorlink decodes them, reassembles full accelerometer and gyroscope
//! samples, and forwards each unit as one UDP datagram.
//!
//! # Crate Structure
//!
//! - [`source`]: Byte sources with a bounded-timeout read contract (serial, files)
//! - [`frame`]: Frame decoding, resynchronization and the synthetic generator
//! - [`bridge`]: Aggregation, datagram encoding, UDP forwarding and run loops

/// Re-export source types.
pub mod source {
    pub use sensorlink_source::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sensorlink_frame::*;
}

/// Re-export bridge types.
pub mod bridge {
    pub use sensorlink_bridge::*;
}
