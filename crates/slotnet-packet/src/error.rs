/// Errors that can occur while encoding, decoding or framing packets.
#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    /// A read asked for more bytes than remain unread in the packet.
    #[error("packet underrun (needed {needed} bytes, {remaining} remaining)")]
    Underrun { needed: usize, remaining: usize },

    /// A length field decoded to a negative value.
    #[error("invalid length field: {0}")]
    InvalidLength(i32),

    /// The length prefix has already been inserted at the front of the packet.
    #[error("length prefix already finalized")]
    AlreadyFinalized,

    /// The packet was handed to a transport before its length prefix was inserted.
    #[error("length prefix not finalized")]
    NotFinalized,

    /// The packet body does not fit the 32-bit length prefix.
    #[error("packet too large for length prefix ({size} bytes)")]
    TooLarge { size: usize },

    /// An I/O error surfaced through the framed codec.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PacketError>;
