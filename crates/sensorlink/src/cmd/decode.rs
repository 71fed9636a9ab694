use std::fs::File;

use sensorlink_bridge::aggregator::SampleAggregator;
use sensorlink_frame::{FrameError, FrameReader};
use sensorlink_source::ReaderSource;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode_summary, OutputFormat, Row, RowPrinter};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.path).map_err(|err| io_error("open failed", err))?;
    let source = ReaderSource::named(file, args.path.display().to_string());
    let mut reader = FrameReader::new(source, args.profile);

    let mut aggregator = SampleAggregator::new();
    let mut printer = RowPrinter::new(format);
    let mut index = 0u64;

    for result in reader.by_ref() {
        let row = match result {
            Ok(frame) if args.aggregate => match aggregator.push(frame.reading()) {
                Some(telemetry) => Row::telemetry(index, &telemetry),
                None => continue,
            },
            Ok(frame) => Row::frame(index, &frame),
            Err(err) if err.is_recoverable() => {
                if !args.faults || matches!(err, FrameError::Timeout) {
                    continue;
                }
                Row::fault(index, &err)
            }
            Err(err) => return Err(frame_error("decode failed", err)),
        };
        printer.print(&row);
        index += 1;
    }
    printer.finish();

    let stats = *reader.stats();
    print_decode_summary(&stats, format);

    if args.strict && stats.faults() > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
