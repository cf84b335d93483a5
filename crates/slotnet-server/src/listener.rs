use std::net::SocketAddr;
use std::sync::Arc;

use slotnet_packet::{split_datagram, Decode};
use slotnet_transport::{InboundSink, SlotId, TransportKind};
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, trace, warn};

use crate::error::ServerError;
use crate::pool::SlotPool;

/// Largest datagram the receive loop accepts.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// What happened to one received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// Shorter than the slot-id header.
    TooShort,
    /// The header named a slot outside the pool.
    InvalidSlot(i32),
    /// First contact: the source became the slot's association.
    Associated(SlotId),
    /// Frames from the associated source went to the sink.
    Dispatched { slot: SlotId, frames: usize },
    /// The source is not the slot's associated peer.
    ForeignSource(SlotId),
}

/// Accept stream connections and bind each to a free slot, forever.
pub async fn accept_loop(listener: TcpListener, pool: Arc<SlotPool>, sink: Arc<dyn InboundSink>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };

        match pool.claim(stream, Arc::clone(&sink)) {
            Ok(slot) => debug!(slot, %peer, "accepted stream connection"),
            Err(ServerError::CapacityExceeded { capacity }) => {
                warn!(%peer, capacity, "server full, rejecting connection");
            }
            Err(err) => warn!(%peer, error = %err, "failed to bind connection"),
        }
    }
}

/// Receive datagrams on the shared socket and route them by slot, forever.
pub async fn datagram_loop(socket: Arc<UdpSocket>, pool: Arc<SlotPool>, sink: Arc<dyn InboundSink>) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!(error = %err, "datagram receive failed");
                continue;
            }
        };

        let outcome = handle_datagram(&pool, sink.as_ref(), &buf[..len], source);
        trace!(%source, len, ?outcome, "datagram handled");
    }
}

/// Route one datagram: `[slot id: i32][frames...]`.
pub fn handle_datagram(
    pool: &SlotPool,
    sink: &dyn InboundSink,
    datagram: &[u8],
    source: SocketAddr,
) -> DatagramOutcome {
    let Ok((raw_slot, header)) = i32::decode(datagram) else {
        return DatagramOutcome::TooShort;
    };

    let Some(client) = usize::try_from(raw_slot)
        .ok()
        .and_then(|id| pool.get(id))
    else {
        debug!(%source, slot = raw_slot, "datagram for invalid slot");
        return DatagramOutcome::InvalidSlot(raw_slot);
    };
    let slot = client.id();
    let channel = client.datagram();

    match channel.association() {
        None => {
            channel.associate(source);
            DatagramOutcome::Associated(slot)
        }
        Some(associated) if associated == source => {
            let frames = split_datagram(&datagram[header..]);
            let count = frames.len();
            for frame in frames {
                sink.on_frame(slot, TransportKind::Datagram, frame);
            }
            DatagramOutcome::Dispatched { slot, frames: count }
        }
        Some(associated) => {
            debug!(slot, %source, %associated, "datagram from foreign source");
            DatagramOutcome::ForeignSource(slot)
        }
    }
}
