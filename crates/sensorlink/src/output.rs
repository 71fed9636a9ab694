use std::io::IsTerminal;
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use sensorlink_bridge::{BridgeStats, Telemetry};
use sensorlink_frame::{DecodeStats, Frame, FrameError, Reading};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// One line of `decode` or `listen` output.
#[derive(Debug, Serialize)]
pub struct Row {
    pub index: u64,
    pub kind: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Row {
    pub fn frame(index: u64, frame: &Frame) -> Self {
        Self {
            index,
            kind: frame.kind().name().to_string(),
            values: vec![reading_value(&frame.reading())],
            bytes: Some(hex(frame.payload())),
            from: None,
            error: None,
        }
    }

    pub fn telemetry(index: u64, telemetry: &Telemetry) -> Self {
        let values = match telemetry {
            Telemetry::Ecg(sample) => vec![f64::from(sample.value())],
            Telemetry::EcgPair(pair) => vec![f64::from(pair.v1.value()), f64::from(pair.v2.value())],
            Telemetry::Temperature(value) => vec![f64::from(*value)],
            Telemetry::Composite { sample, .. } => {
                sample.to_array().into_iter().map(f64::from).collect()
            }
        };
        Self {
            index,
            kind: telemetry.kind_name().to_string(),
            values,
            bytes: None,
            from: None,
            error: None,
        }
    }

    pub fn fault(index: u64, err: &FrameError) -> Self {
        Self {
            index,
            kind: "fault".to_string(),
            values: Vec::new(),
            bytes: None,
            from: None,
            error: Some(err.to_string()),
        }
    }

    pub fn with_sender(mut self, from: SocketAddr) -> Self {
        self.from = Some(from.to_string());
        self
    }

    fn value_text(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        self.values
            .iter()
            .map(|v| format!("{v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Prints rows as they arrive; table output is buffered until `finish`.
pub struct RowPrinter {
    format: OutputFormat,
    table: Option<Table>,
}

impl RowPrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = (format == OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "VALUE", "BYTES"]);
            table
        });
        Self { format, table }
    }

    pub fn print(&mut self, row: &Row) {
        match self.format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputFormat::Pretty => {
                let mut line = format!("#{} {} {}", row.index, row.kind, row.value_text());
                if let Some(bytes) = &row.bytes {
                    line.push_str(&format!(" [{bytes}]"));
                }
                if let Some(from) = &row.from {
                    line.push_str(&format!(" from={from}"));
                }
                println!("{line}");
            }
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        row.index.to_string(),
                        row.kind.clone(),
                        row.value_text(),
                        row.bytes.clone().unwrap_or_default(),
                    ]);
                }
            }
        }
    }

    pub fn finish(self) {
        if let Some(table) = self.table {
            println!("{table}");
        }
    }
}

#[derive(Serialize)]
struct DecodeSummary<'a> {
    #[serde(flatten)]
    stats: &'a DecodeStats,
    faults: u64,
}

impl<'a> DecodeSummary<'a> {
    fn new(stats: &'a DecodeStats) -> Self {
        Self {
            stats,
            faults: stats.faults(),
        }
    }
}

pub fn print_decode_summary(stats: &DecodeStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&DecodeSummary::new(stats))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "frames={} discarded_bytes={} sync_losses={} checksum_mismatches={} unknown_types={} incomplete={}",
                stats.frames,
                stats.bytes_discarded,
                stats.sync_losses,
                stats.checksum_mismatches,
                stats.unknown_types,
                stats.incomplete_frames
            );
        }
    }
}

pub fn print_run_summary(stats: &BridgeStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FRAMES", "SENT", "SEND FAILURES", "DECODE FAULTS", "TIMEOUTS"])
                .add_row(vec![
                    stats.frames.to_string(),
                    stats.packets_sent.to_string(),
                    stats.send_failures.to_string(),
                    stats.decode_faults.to_string(),
                    stats.timeouts.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frames={} sent={} send_failures={} decode_faults={} timeouts={} stale_discards={}",
                stats.frames,
                stats.packets_sent,
                stats.send_failures,
                stats.decode_faults,
                stats.timeouts,
                stats.stale_discards
            );
        }
    }
}

fn reading_value(reading: &Reading) -> f64 {
    match reading {
        Reading::Ecg(sample) => f64::from(sample.value()),
        Reading::Temperature(value) => f64::from(*value),
        Reading::Axis(sample) => f64::from(sample.value),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
