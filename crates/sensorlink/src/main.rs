mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sensorlink", version, about = "Serial sensor telemetry to UDP bridge")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { exit::USAGE } else { exit::SUCCESS };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_synthetic_source() {
        let cli = Cli::try_parse_from([
            "sensorlink",
            "run",
            "--synthetic",
            "--seed",
            "4",
            "--dest",
            "127.0.0.1:4000",
            "--mode",
            "threaded",
        ])
        .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert!(args.synthetic);
                assert_eq!(args.dest, Some("127.0.0.1:4000".parse().unwrap()));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn seed_requires_synthetic() {
        let err = Cli::try_parse_from(["sensorlink", "run", "--seed", "4"])
            .expect_err("seed without synthetic should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_unknown_profile() {
        let err = Cli::try_parse_from(["sensorlink", "decode", "capture.bin", "--profile", "cobs"])
            .expect_err("unknown profile should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_generate_defaults() {
        let cli = Cli::try_parse_from(["sensorlink", "generate", "-o", "/tmp/out.bin"])
            .expect("generate args should parse");
        match cli.command {
            Command::Generate(args) => assert_eq!(args.cycles, 10),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
