use std::fs::File;
use std::io::{BufWriter, Write};

use sensorlink_frame::{SyntheticConfig, SyntheticSource};
use sensorlink_source::{ByteSource, ReadOutcome};
use tracing::info;

use crate::cmd::GenerateArgs;
use crate::exit::{io_error, source_error, CliResult, SUCCESS};

pub fn run(args: GenerateArgs) -> CliResult<i32> {
    let mut source = SyntheticSource::new(SyntheticConfig {
        profile: args.profile,
        seed: args.seed,
        garbage: args.garbage,
        cycles: Some(args.cycles),
        ..SyntheticConfig::default()
    });

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|err| io_error("create failed", err))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut chunk = [0u8; 1024];
    let mut written = 0usize;
    loop {
        match source
            .read_bytes(&mut chunk)
            .map_err(|err| source_error("generate failed", err))?
        {
            ReadOutcome::Data(n) => {
                out.write_all(&chunk[..n])
                    .map_err(|err| io_error("write failed", err))?;
                written += n;
            }
            ReadOutcome::Timeout => continue,
            ReadOutcome::Closed => break,
        }
    }
    out.flush().map_err(|err| io_error("write failed", err))?;

    info!(
        cycles = source.cycles(),
        bytes = written,
        profile = %args.profile,
        "synthetic stream written"
    );
    Ok(SUCCESS)
}
