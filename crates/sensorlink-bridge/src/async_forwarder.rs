//! Tokio rendition of the bridge for callers already running a runtime.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use futures_util::StreamExt;
use sensorlink_frame::{FrameError, FramingProfile, TelemetryCodec};
use tokio::io::AsyncRead;
use tokio::net::UdpSocket;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::encoder::OutboundPacket;
use crate::error::{ForwardError, Result};
use crate::pipeline::{BridgeStats, PacketAssembler};

/// Async UDP sender with the same fire-and-forget contract as
/// [`UdpForwarder`](crate::UdpForwarder).
#[derive(Debug)]
pub struct AsyncUdpForwarder {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl AsyncUdpForwarder {
    pub async fn bind(destination: SocketAddr) -> std::result::Result<Self, ForwardError> {
        let local: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(ForwardError::Bind)?;
        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub async fn send(&self, packet: &OutboundPacket) -> std::result::Result<usize, ForwardError> {
        self.socket
            .send_to(packet.as_bytes(), self.destination)
            .await
            .map_err(|source| ForwardError::SinkUnavailable {
                destination: self.destination,
                source,
            })
    }
}

/// Decode frames from `reader` and forward them until cancelled or EOF.
///
/// A read that produces nothing for `read_timeout` abandons any partial
/// frame, matching the blocking drivers.
pub async fn run_async<R>(
    reader: R,
    profile: FramingProfile,
    assembler: &mut PacketAssembler,
    forwarder: &AsyncUdpForwarder,
    read_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<BridgeStats>
where
    R: AsyncRead + Unpin,
{
    let mut framed = FramedRead::new(reader, TelemetryCodec::new(profile));
    let mut stats = BridgeStats::default();
    info!(destination = %forwarder.destination(), %profile, "async bridge starting");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = tokio::time::timeout(read_timeout, framed.next()) => next,
        };

        let item = match next {
            Err(_elapsed) => {
                let fault = framed.decoder_mut().abort().unwrap_or(FrameError::Timeout);
                stats.record_fault(&fault);
                continue;
            }
            Ok(None) => break,
            Ok(Some(item)) => item?,
        };

        match item {
            Ok(frame) => {
                stats.frames += 1;
                let Some(packet) = assembler.assemble(frame.reading()) else {
                    continue;
                };
                match forwarder.send(&packet).await {
                    Ok(_) => stats.packets_sent += 1,
                    Err(err) => {
                        stats.send_failures += 1;
                        warn!(label = ?packet.label(), error = %err, "packet dropped");
                    }
                }
            }
            Err(fault) => {
                debug!(error = %fault, "decode fault");
                stats.record_fault(&fault);
            }
        }
    }

    stats.decode = *framed.decoder().stats();
    stats.stale_discards = assembler.aggregator().stale_discards();
    info!(
        frames = stats.frames,
        packets_sent = stats.packets_sent,
        "async bridge stopped"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use sensorlink_frame::{encode_reading, Axis, Domain, Reading};
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::encoder::EcgLayout;
    use crate::sample::Telemetry;

    #[tokio::test]
    async fn forwards_stream_until_eof() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let forwarder = AsyncUdpForwarder::bind(rx.local_addr().unwrap()).await.unwrap();

        let mut wire = BytesMut::new();
        for (axis, value) in [(Axis::Z, 3.0), (Axis::X, 1.0), (Axis::Y, 2.0)] {
            encode_reading(&Reading::axis(Domain::Accel, axis, value), &mut wire);
        }
        wire.extend_from_slice(&[0x00, 0x01]);
        encode_reading(&Reading::Temperature(10.0), &mut wire);

        let (mut tx, input) = tokio::io::duplex(256);
        tx.write_all(&wire).await.unwrap();
        drop(tx);

        let mut assembler = PacketAssembler::new(EcgLayout::Passthrough);
        let stats = run_async(
            input,
            FramingProfile::Headered,
            &mut assembler,
            &forwarder,
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(stats.frames, 4);
        assert_eq!(stats.packets_sent, 2);
        assert_eq!(stats.decode_faults, 0);
        assert_eq!(stats.decode.sync_losses, 1);

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(
            OutboundPacket::parse(&buf[..n]),
            Ok(Telemetry::Composite {
                domain: Domain::Accel,
                sample: crate::sample::CompositeSample::new(1.0, 2.0, 3.0),
            })
        );
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01, 0x00, 0x00, 0x20, 0x41]);
    }

    #[tokio::test]
    async fn cancellation_stops_idle_stream() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let forwarder = AsyncUdpForwarder::bind(rx.local_addr().unwrap()).await.unwrap();
        let (_tx, input) = tokio::io::duplex(64);

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let mut assembler = PacketAssembler::default();
        let stats = run_async(
            input,
            FramingProfile::Headered,
            &mut assembler,
            &forwarder,
            Duration::from_millis(10),
            token,
        )
        .await
        .unwrap();

        assert_eq!(stats.frames, 0);
        assert!(stats.timeouts > 0);
    }
}
