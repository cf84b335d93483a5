use std::fmt;

use slotnet_packet::Frame;

/// Identity of a client slot, stable for the lifetime of the pool.
pub type SlotId = usize;

/// Which transport a channel (or an inbound frame) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Stream,
    Datagram,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::Datagram => f.write_str("datagram"),
        }
    }
}

/// Receiver of everything the channels read off the network.
///
/// Called from receive tasks, so implementations must not block.
pub trait InboundSink: Send + Sync + 'static {
    /// A complete frame arrived for `slot`.
    fn on_frame(&self, slot: SlotId, kind: TransportKind, frame: Frame);

    /// The stream connection with the given generation ended.
    ///
    /// `generation` identifies the connection that ended, so a late report
    /// never tears down a newer connection on the same slot.
    fn on_stream_closed(&self, slot: SlotId, generation: u64);
}
