//! Fire-and-forget datagram transport.

use crate::message::OutboundMessage;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to bind local socket: {0}")]
    Bind(std::io::Error),
    #[error("failed to encode {addr}: {reason}")]
    Encode { addr: &'static str, reason: String },
    #[error("send to {target} failed: {source}")]
    Send {
        target: SocketAddr,
        source: std::io::Error,
    },
}

/// Delivers outbound messages. No ordering or delivery guarantee.
pub trait Transport {
    fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        (**self).send(message)
    }
}

/// One OSC packet per UDP datagram to a fixed receiver.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port in the target's address family.
    pub fn connect(target: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(TransportError::Bind)?;

        tracing::info!(
            local = ?socket.local_addr().ok(),
            %target,
            "OSC transport ready"
        );

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, message: &OutboundMessage) -> Result<(), TransportError> {
        let bytes = message.encode().map_err(|e| TransportError::Encode {
            addr: message.addr(),
            reason: e.to_string(),
        })?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|source| TransportError::Send {
                target: self.target,
                source,
            })?;
        Ok(())
    }
}
