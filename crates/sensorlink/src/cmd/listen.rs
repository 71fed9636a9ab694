use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sensorlink_bridge::OutboundPacket;
use tracing::{info, warn};

use crate::cmd::ListenArgs;
use crate::exit::{io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{OutputFormat, Row, RowPrinter};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let socket = UdpSocket::bind(args.bind).map_err(|err| io_error("bind failed", err))?;
    socket
        .set_read_timeout(Some(POLL_INTERVAL))
        .map_err(|err| io_error("bind failed", err))?;
    info!(bind = %args.bind, "listening for telemetry");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let mut printer = RowPrinter::new(format);
    let mut buf = [0u8; 64];
    let mut received = 0usize;

    while running.load(Ordering::SeqCst) {
        let (n, from) = match socket.recv_from(&mut buf) {
            Ok(ok) => ok,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(err) => return Err(io_error("receive failed", err)),
        };

        match OutboundPacket::parse(&buf[..n]) {
            Ok(telemetry) => {
                printer.print(&Row::telemetry(received as u64, &telemetry).with_sender(from));
                received = received.saturating_add(1);
            }
            Err(err) => warn!(%from, error = %err, "ignoring datagram"),
        }

        if args.count.is_some_and(|count| received >= count) {
            break;
        }
    }

    printer.finish();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
