use std::net::SocketAddr;
use std::path::PathBuf;

use sensorlink_frame::FrameError;
use sensorlink_source::SourceError;

/// Errors from sending datagrams.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// Could not create the local UDP socket.
    #[error("failed to bind local UDP socket: {0}")]
    Bind(std::io::Error),

    /// The destination could not be reached; the packet was dropped.
    #[error("sink {destination} unavailable: {source}")]
    SinkUnavailable {
        destination: SocketAddr,
        source: std::io::Error,
    },
}

/// Errors from parsing an outbound datagram.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PacketError {
    /// Zero-length datagram.
    #[error("empty datagram")]
    Empty,

    /// Label byte is not a known telemetry kind.
    #[error("unknown label {0}")]
    UnknownLabel(u8),

    /// Payload length does not fit the label.
    #[error("label {label} cannot carry a {len}-byte payload")]
    BadLength { label: u8, len: usize },
}

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The byte source could not be opened or failed while running.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Non-recoverable decode error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Forwarder setup failed.
    #[error("forward error: {0}")]
    Forward(#[from] ForwardError),

    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The source reader thread could not be started.
    #[error("failed to spawn source thread: {0}")]
    Spawn(std::io::Error),

    /// The source reader thread panicked.
    #[error("source thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
