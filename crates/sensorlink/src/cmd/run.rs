use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sensorlink_bridge::config::{DEFAULT_BAUD, DEFAULT_DEVICE};
use sensorlink_bridge::{BridgeConfig, SourceConfig};

use crate::cmd::{parse_duration, RunArgs};
use crate::exit::{bridge_error, config_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_run_summary, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = build_config(&args)?;

    let stop = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&stop))?;

    let stats = sensorlink_bridge::run(&config, &stop).map_err(|err| bridge_error("bridge failed", err))?;
    print_run_summary(&stats, format);
    Ok(SUCCESS)
}

/// Start from the config file (or defaults) and apply flag overrides.
fn build_config(args: &RunArgs) -> CliResult<BridgeConfig> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path).map_err(|err| config_error("config", err))?,
        None => BridgeConfig::default(),
    };

    if args.synthetic {
        let interval_ms = args
            .interval
            .as_deref()
            .map(parse_duration)
            .transpose()?
            .map(|d| d.as_millis() as u64);
        config.source = SourceConfig::Synthetic {
            interval_ms,
            seed: args.seed,
            garbage: args.garbage,
            cycles: args.cycles,
        };
    } else if args.device.is_some() || args.baud.is_some() {
        let (device, baud) = match &config.source {
            SourceConfig::Serial { device, baud } => (device.clone(), *baud),
            SourceConfig::Synthetic { .. } => (PathBuf::from(DEFAULT_DEVICE), DEFAULT_BAUD),
        };
        config.source = SourceConfig::Serial {
            device: args.device.clone().unwrap_or(device),
            baud: args.baud.unwrap_or(baud),
        };
    }

    if let Some(dest) = args.dest {
        config.destination = dest;
    }
    if let Some(timeout) = &args.read_timeout {
        config.read_timeout_ms = parse_duration(timeout)?.as_millis() as u64;
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    if let Some(stale) = &args.stale_after {
        config.stale_after_ms = Some(parse_duration(stale)?.as_millis() as u64);
    }
    if let Some(layout) = args.ecg_layout {
        config.ecg_layout = layout;
    }

    config.validate().map_err(|err| config_error("config", err))?;
    Ok(config)
}

fn install_ctrlc_handler(stop: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
