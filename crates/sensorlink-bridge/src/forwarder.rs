//! Fire-and-forget UDP delivery.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use tracing::{debug, info};

use crate::encoder::OutboundPacket;
use crate::error::ForwardError;

/// Where encoded datagrams go.
///
/// Implementations must not block waiting for the receiver and must not
/// retry; a failed send drops the packet.
pub trait DatagramSink: Send {
    /// Send one packet. Returns the number of bytes handed to the network.
    fn send(&mut self, packet: &OutboundPacket) -> Result<usize, ForwardError>;

    /// Human-readable destination for logs.
    fn destination(&self) -> String;
}

impl<K: DatagramSink + ?Sized> DatagramSink for Box<K> {
    fn send(&mut self, packet: &OutboundPacket) -> Result<usize, ForwardError> {
        (**self).send(packet)
    }

    fn destination(&self) -> String {
        (**self).destination()
    }
}

/// Sends each packet as one UDP datagram to a fixed destination.
///
/// No acknowledgement, no retransmission. Whether anyone is listening makes
/// no difference to the sender.
#[derive(Debug)]
pub struct UdpForwarder {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpForwarder {
    /// Bind an ephemeral local socket of the destination's address family.
    pub fn bind(destination: SocketAddr) -> Result<Self, ForwardError> {
        let local: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(ForwardError::Bind)?;
        socket.set_nonblocking(true).map_err(ForwardError::Bind)?;

        info!(%destination, local = ?socket.local_addr().ok(), "UDP forwarder ready");
        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn destination_addr(&self) -> SocketAddr {
        self.destination
    }

    /// Send to an explicit destination instead of the configured one.
    pub fn send_to(
        &self,
        packet: &OutboundPacket,
        destination: SocketAddr,
    ) -> Result<usize, ForwardError> {
        let sent = self
            .socket
            .send_to(packet.as_bytes(), destination)
            .map_err(|source| ForwardError::SinkUnavailable {
                destination,
                source,
            })?;
        debug!(label = ?packet.label(), bytes = sent, "datagram sent");
        Ok(sent)
    }
}

impl DatagramSink for UdpForwarder {
    fn send(&mut self, packet: &OutboundPacket) -> Result<usize, ForwardError> {
        self.send_to(packet, self.destination)
    }

    fn destination(&self) -> String {
        self.destination.to_string()
    }
}
