use std::net::SocketAddr;

use slotnet_packet::Packet;

use crate::datagram::DatagramChannel;
use crate::error::Result;
use crate::inbound::{SlotId, TransportKind};
use crate::stream::StreamChannel;

/// Either transport channel of a slot, behind one capability set.
#[derive(Debug, Clone, Copy)]
pub enum Channel<'a> {
    Stream(&'a StreamChannel),
    Datagram(&'a DatagramChannel),
}

impl Channel<'_> {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Stream(_) => TransportKind::Stream,
            Self::Datagram(_) => TransportKind::Datagram,
        }
    }

    pub fn slot(&self) -> SlotId {
        match self {
            Self::Stream(ch) => ch.slot(),
            Self::Datagram(ch) => ch.slot(),
        }
    }

    /// Whether the channel has a connection (stream) or association (datagram).
    pub fn is_connected(&self) -> bool {
        match self {
            Self::Stream(ch) => ch.is_connected(),
            Self::Datagram(ch) => ch.is_connected(),
        }
    }

    /// Remote address the channel currently talks to.
    pub fn remote(&self) -> Option<SocketAddr> {
        match self {
            Self::Stream(ch) => ch.peer_addr(),
            Self::Datagram(ch) => ch.association(),
        }
    }

    /// Send a finalized packet.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        match self {
            Self::Stream(ch) => ch.send(packet).await,
            Self::Datagram(ch) => ch.send(packet).await,
        }
    }

    pub fn disconnect(&self) -> bool {
        match self {
            Self::Stream(ch) => ch.disconnect(),
            Self::Datagram(ch) => ch.disconnect(),
        }
    }
}
