//! Bridge configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config
//! that reads `/dev/ttyUSB0` and forwards to `127.0.0.1:3000`.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sensorlink_frame::{FramingProfile, SyntheticConfig, SyntheticSource};
use sensorlink_source::ByteSource;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::encoder::EcgLayout;
use crate::error::{BridgeError, ConfigError};

/// Default UDP destination of the visualizer.
pub const DEFAULT_DESTINATION: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);
/// Default serial device.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
/// Default serial line speed.
pub const DEFAULT_BAUD: u32 = 115_200;
/// Default read timeout in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
/// Default bounded queue capacity in threaded mode.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Where bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A serial device in raw 8N1 mode.
    Serial {
        #[serde(default = "default_device")]
        device: PathBuf,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    /// Generated readings, for running without hardware.
    Synthetic {
        #[serde(default)]
        interval_ms: Option<u64>,
        #[serde(default)]
        seed: Option<u64>,
        #[serde(default)]
        garbage: bool,
        #[serde(default)]
        cycles: Option<u64>,
    },
}

fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE)
}

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Serial {
            device: default_device(),
            baud: DEFAULT_BAUD,
        }
    }
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Serial { .. } => "serial",
            SourceConfig::Synthetic { .. } => "synthetic",
        }
    }
}

/// How the decode loop is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Read, decode and forward on the calling thread.
    #[default]
    Polling,
    /// A reader thread feeds a bounded queue drained by the decoder.
    Threaded,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Polling => "polling",
            RunMode::Threaded => "threaded",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" => Ok(RunMode::Polling),
            "threaded" => Ok(RunMode::Threaded),
            other => Err(format!(
                "unknown run mode {other:?} (expected polling or threaded)"
            )),
        }
    }
}

/// Complete bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub source: SourceConfig,
    pub destination: SocketAddr,
    pub read_timeout_ms: u64,
    pub profile: FramingProfile,
    pub mode: RunMode,
    pub queue_capacity: usize,
    pub stale_after_ms: Option<u64>,
    pub ecg_layout: EcgLayout,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            destination: DEFAULT_DESTINATION,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            profile: FramingProfile::default(),
            mode: RunMode::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stale_after_ms: None,
            ecg_layout: EcgLayout::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "read_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.stale_after_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "stale_after_ms must be greater than zero when set".to_string(),
            ));
        }
        if self.destination.port() == 0 {
            return Err(ConfigError::Invalid(
                "destination port must not be zero".to_string(),
            ));
        }

        match &self.source {
            SourceConfig::Serial { device, baud } => {
                if device.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid("serial device path is empty".to_string()));
                }
                validate_baud(*baud)?;
            }
            SourceConfig::Synthetic {
                interval_ms,
                cycles,
                ..
            } => {
                if *interval_ms == Some(0) {
                    return Err(ConfigError::Invalid(
                        "interval_ms must be greater than zero when set".to_string(),
                    ));
                }
                if *cycles == Some(0) {
                    return Err(ConfigError::Invalid(
                        "cycles must be greater than zero when set".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_ms.map(Duration::from_millis)
    }

    /// Open the configured byte source.
    ///
    /// This is the only step whose failure is fatal to the bridge.
    pub fn open_source(&self) -> Result<Box<dyn ByteSource>, BridgeError> {
        match &self.source {
            SourceConfig::Serial { device, baud } => open_serial(device, *baud, self.read_timeout()),
            SourceConfig::Synthetic {
                interval_ms,
                seed,
                garbage,
                cycles,
            } => {
                info!(seed = ?seed, garbage, "using synthetic source");
                Ok(Box::new(SyntheticSource::new(SyntheticConfig {
                    profile: self.profile,
                    interval: interval_ms.map(Duration::from_millis),
                    read_timeout: self.read_timeout(),
                    seed: *seed,
                    garbage: *garbage,
                    cycles: *cycles,
                })))
            }
        }
    }
}

#[cfg(unix)]
fn validate_baud(baud: u32) -> Result<(), ConfigError> {
    if sensorlink_source::serial::baud_constant(baud).is_none() {
        return Err(ConfigError::Invalid(format!("unsupported baud rate {baud}")));
    }
    Ok(())
}

#[cfg(not(unix))]
fn validate_baud(_baud: u32) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(
        "serial sources are only supported on unix".to_string(),
    ))
}

#[cfg(unix)]
fn open_serial(
    device: &Path,
    baud: u32,
    read_timeout: Duration,
) -> Result<Box<dyn ByteSource>, BridgeError> {
    let port = sensorlink_source::SerialPort::open(&sensorlink_source::SerialConfig {
        path: device.to_path_buf(),
        baud,
        read_timeout,
    })?;
    info!(device = %device.display(), baud, "serial port open");
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_serial(
    device: &Path,
    _baud: u32,
    _read_timeout: Duration,
) -> Result<Box<dyn ByteSource>, BridgeError> {
    Err(BridgeError::Config(ConfigError::Invalid(format!(
        "cannot open {}: serial sources are only supported on unix",
        device.display()
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = BridgeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.destination.to_string(), "127.0.0.1:3000");
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.stale_after(), None);
        assert_eq!(
            config.source,
            SourceConfig::Serial {
                device: PathBuf::from("/dev/ttyUSB0"),
                baud: 115_200
            }
        );
    }

    #[test]
    fn full_config_parses() {
        let json = r#"{
            "source": { "kind": "synthetic", "interval_ms": 10, "seed": 7 },
            "destination": "10.0.0.5:4000",
            "read_timeout_ms": 250,
            "profile": "prefix",
            "mode": "threaded",
            "queue_capacity": 8,
            "stale_after_ms": 500,
            "ecg_layout": "paired"
        }"#;
        let config = BridgeConfig::from_json_str(json).unwrap();

        assert_eq!(config.destination, "10.0.0.5:4000".parse().unwrap());
        assert_eq!(config.profile, FramingProfile::Prefix);
        assert_eq!(config.mode, RunMode::Threaded);
        assert_eq!(config.ecg_layout, EcgLayout::Paired);
        assert_eq!(config.stale_after(), Some(Duration::from_millis(500)));
        assert_eq!(config.source.kind(), "synthetic");
    }

    #[test]
    fn serial_fields_default() {
        let config =
            BridgeConfig::from_json_str(r#"{ "source": { "kind": "serial", "device": "/dev/ttyACM0" } }"#)
                .unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Serial {
                device: PathBuf::from("/dev/ttyACM0"),
                baud: 115_200
            }
        );
    }

    #[test]
    fn zero_values_rejected() {
        for json in [
            r#"{ "read_timeout_ms": 0 }"#,
            r#"{ "queue_capacity": 0 }"#,
            r#"{ "stale_after_ms": 0 }"#,
            r#"{ "destination": "127.0.0.1:0" }"#,
            r#"{ "source": { "kind": "synthetic", "interval_ms": 0 } }"#,
        ] {
            assert!(
                matches!(BridgeConfig::from_json_str(json), Err(ConfigError::Invalid(_))),
                "{json} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn bad_baud_rejected() {
        let err = BridgeConfig::from_json_str(r#"{ "source": { "kind": "serial", "baud": 12345 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("12345"));
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(matches!(
            BridgeConfig::from_json_str(r#"{ "destinaton": "127.0.0.1:1" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BridgeConfig::from_file(Path::new("/nonexistent/sensorlink.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/sensorlink.json"));
    }

    #[test]
    fn synthetic_source_opens() {
        let config = BridgeConfig {
            source: SourceConfig::Synthetic {
                interval_ms: None,
                seed: Some(1),
                garbage: false,
                cycles: Some(1),
            },
            ..BridgeConfig::default()
        };
        let source = config.open_source().unwrap();
        assert_eq!(source.name(), "synthetic");
    }

    #[test]
    fn run_mode_parses() {
        assert_eq!("Threaded".parse::<RunMode>(), Ok(RunMode::Threaded));
        assert!("async".parse::<RunMode>().is_err());
    }
}
