use std::net::SocketAddr;

use slotnet_packet::PacketError;

/// Errors that can occur on a stream or datagram channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel already carries a connection.
    #[error("channel already connected")]
    Occupied,

    /// The channel has no connection or association to send on.
    #[error("channel not connected")]
    NotConnected,

    /// The packet was sent before its length prefix was inserted.
    #[error("packet has no length prefix")]
    Unframed,

    /// A packet could not be encoded or decoded.
    #[error(transparent)]
    Packet(#[from] PacketError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
