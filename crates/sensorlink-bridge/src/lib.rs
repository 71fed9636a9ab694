//! From decoded frames to UDP datagrams.
//!
//! Single-axis readings are reassembled into composite samples, encoded
//! into the visualizer's datagram format (label byte + little-endian floats)
//! and sent fire-and-forget. [`pipeline`] drives the whole chain from a byte
//! source, either inline on one thread or split across a bounded queue.

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod forwarder;
pub mod pipeline;
pub mod sample;

#[cfg(feature = "async")]
pub mod async_forwarder;

pub use aggregator::{EcgPairer, SampleAggregator};
pub use config::{BridgeConfig, RunMode, SourceConfig};
pub use encoder::{encode, EcgLayout, Label, OutboundPacket};
pub use error::{BridgeError, ConfigError, ForwardError, PacketError, Result};
pub use forwarder::{DatagramSink, UdpForwarder};
pub use pipeline::{run, run_polling, run_threaded, Bridge, BridgeStats, PacketAssembler};
pub use sample::{CompositeSample, EcgPair, Telemetry};

#[cfg(feature = "async")]
pub use async_forwarder::{run_async, AsyncUdpForwarder};
