use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use sensorlink_bridge::{EcgLayout, RunMode};
use sensorlink_frame::FramingProfile;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod generate;
pub mod listen;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge a serial (or synthetic) source to a UDP destination.
    Run(RunArgs),
    /// Decode a captured byte stream and print each frame.
    Decode(DecodeArgs),
    /// Write a synthetic device stream.
    Generate(GenerateArgs),
    /// Receive bridge datagrams and print them.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Generate(args) => generate::run(args),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON config file; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Serial device to read.
    #[arg(long, value_name = "PATH", env = "SENSORLINK_DEVICE")]
    pub device: Option<PathBuf>,
    /// Serial line speed.
    #[arg(long)]
    pub baud: Option<u32>,
    /// Read generated readings instead of a serial device.
    #[arg(long)]
    pub synthetic: bool,
    /// Pause between synthetic cycles (e.g. 10ms, 1s).
    #[arg(long, value_name = "DURATION", requires = "synthetic")]
    pub interval: Option<String>,
    /// Seed for the synthetic generator.
    #[arg(long, requires = "synthetic")]
    pub seed: Option<u64>,
    /// Mix random noise bytes into the synthetic stream.
    #[arg(long, requires = "synthetic")]
    pub garbage: bool,
    /// Stop after N synthetic cycles.
    #[arg(long, requires = "synthetic")]
    pub cycles: Option<u64>,
    /// UDP destination of the visualizer.
    #[arg(long, value_name = "ADDR", env = "SENSORLINK_DEST")]
    pub dest: Option<SocketAddr>,
    /// Upper bound on a single source read (e.g. 1s, 250ms).
    #[arg(long, value_name = "DURATION")]
    pub read_timeout: Option<String>,
    /// Inbound framing profile (headered, prefix).
    #[arg(long)]
    pub profile: Option<FramingProfile>,
    /// Decode loop scheduling (polling, threaded).
    #[arg(long)]
    pub mode: Option<RunMode>,
    /// Queued chunks before the reader thread blocks (threaded mode).
    #[arg(long)]
    pub queue_capacity: Option<usize>,
    /// Drop a partial axis set older than this (e.g. 500ms).
    #[arg(long, value_name = "DURATION")]
    pub stale_after: Option<String>,
    /// Outbound ECG layout (passthrough, paired).
    #[arg(long)]
    pub ecg_layout: Option<EcgLayout>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to decode.
    pub path: PathBuf,
    /// Inbound framing profile (headered, prefix).
    #[arg(long, default_value = "headered")]
    pub profile: FramingProfile,
    /// Print aggregated telemetry instead of individual frames.
    #[arg(long)]
    pub aggregate: bool,
    /// Print decode faults as rows.
    #[arg(long)]
    pub faults: bool,
    /// Exit with a data error if any frame was rejected.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output file. Writes to stdout when omitted.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Number of cycles to generate.
    #[arg(long, default_value = "10")]
    pub cycles: u64,
    /// Seed for a reproducible stream.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Framing profile of the generated stream (headered, prefix).
    #[arg(long, default_value = "headered")]
    pub profile: FramingProfile,
    /// Mix random noise bytes between frames.
    #[arg(long)]
    pub garbage: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind.
    #[arg(default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
    /// Exit after receiving N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
