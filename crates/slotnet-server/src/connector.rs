use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{BufMut, BytesMut};
use futures_util::{SinkExt, StreamExt};
use slotnet_packet::{split_datagram, Frame, Packet, PacketCodec};
use slotnet_transport::{SlotId, TransportError};
use tokio::net::{TcpStream, UdpSocket};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::listener::MAX_DATAGRAM_SIZE;

/// Client side of a stream connection.
#[derive(Debug)]
pub struct StreamClient {
    framed: Framed<TcpStream, PacketCodec>,
}

impl StreamClient {
    /// Connect to a server's TCP address.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        debug!(%addr, "stream client connected");
        Ok(Self {
            framed: Framed::new(stream, PacketCodec::new()),
        })
    }

    /// Send one packet, inserting its length prefix if needed.
    pub async fn send(&mut self, packet: Packet) -> Result<()> {
        self.framed.send(packet).await?;
        Ok(())
    }

    /// Wait for the next frame. `None` once the server closes the connection.
    pub async fn recv(&mut self) -> Result<Option<Frame>> {
        self.framed.next().await.transpose().map_err(Into::into)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.framed.get_ref().local_addr()?)
    }
}

/// Client side of a slot's datagram channel.
///
/// Every outgoing datagram starts with the slot id, as the server expects.
/// The first one sent is the rendezvous and is not dispatched.
#[derive(Debug)]
pub struct DatagramClient {
    socket: UdpSocket,
    slot: SlotId,
}

impl DatagramClient {
    /// Bind an ephemeral local socket aimed at `server` for `slot`.
    pub async fn connect(server: SocketAddr, slot: SlotId) -> Result<Self> {
        let local = match server {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        Self::bind(local, server, slot).await
    }

    /// Like [`connect`](Self::connect), from a fixed local address.
    ///
    /// The server keeps a slot's association until that slot's stream
    /// disconnects, so a client that talks to a slot over UDP only must come
    /// back from the same address to be heard again.
    pub async fn bind(local: SocketAddr, server: SocketAddr, slot: SlotId) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind { addr: local, source })?;
        socket
            .connect(server)
            .await
            .map_err(|source| TransportError::Connect { addr: server, source })?;
        debug!(%server, slot, "datagram client ready");
        Ok(Self { socket, slot })
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Send the slot id alone, establishing the server-side association.
    pub async fn rendezvous(&self) -> Result<()> {
        self.send_datagram(&[]).await
    }

    /// Send packets in one datagram after the slot-id header.
    pub async fn send(&self, packets: impl IntoIterator<Item = Packet>) -> Result<()> {
        let mut body = BytesMut::new();
        for mut packet in packets {
            if !packet.is_finalized() {
                packet.finalize_length_prefix()?;
            }
            body.put_slice(packet.as_bytes());
        }
        self.send_datagram(&body).await
    }

    /// Wait for one datagram and split it into frames.
    pub async fn recv(&self) -> Result<Vec<Frame>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let len = self.socket.recv(&mut buf).await?;
        Ok(split_datagram(&buf[..len]))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn send_datagram(&self, body: &[u8]) -> Result<()> {
        let slot = i32::try_from(self.slot).map_err(|_| ServerError::UnknownSlot(self.slot))?;
        let mut datagram = BytesMut::with_capacity(4 + body.len());
        datagram.put_i32_le(slot);
        datagram.put_slice(body);
        self.socket.send(&datagram).await?;
        Ok(())
    }
}
