use slotnet_transport::SlotId;

/// Errors that can occur while running the server or its clients.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] slotnet_transport::TransportError),

    /// Packet encoding or decoding error.
    #[error("packet error: {0}")]
    Packet(#[from] slotnet_packet::PacketError),

    /// Work lane error.
    #[error("lane error: {0}")]
    Lane(#[from] slotnet_lanes::LaneError),

    /// Every slot in the pool is taken.
    #[error("server full ({capacity} slots in use)")]
    CapacityExceeded { capacity: usize },

    /// The addressed slot does not exist.
    #[error("no such slot: {0}")]
    UnknownSlot(SlotId),

    /// No handler is registered for the packet type.
    #[error("no handler registered for packet type {0}")]
    UnknownPacketType(i32),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error outside a channel (config files, client sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection closed before the expected reply arrived.
    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ServerError>;
