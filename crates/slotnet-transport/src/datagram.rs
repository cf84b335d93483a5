use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotnet_packet::Packet;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::inbound::SlotId;

/// A slot's UDP channel: an association on the socket shared by the pool.
///
/// The association is set by the first datagram that names this slot and is
/// cleared when the slot disconnects.
#[derive(Debug)]
pub struct DatagramChannel {
    slot: SlotId,
    socket: Arc<UdpSocket>,
    association: Mutex<Option<SocketAddr>>,
}

impl DatagramChannel {
    pub fn new(slot: SlotId, socket: Arc<UdpSocket>) -> Self {
        Self {
            slot,
            socket,
            association: Mutex::new(None),
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Record `remote` as this slot's peer if no association exists yet.
    ///
    /// Returns `true` when the association was created by this call.
    pub fn associate(&self, remote: SocketAddr) -> bool {
        let mut association = self.lock_association();
        if association.is_some() {
            return false;
        }
        *association = Some(remote);
        info!(slot = self.slot, %remote, "datagram association established");
        true
    }

    pub fn association(&self) -> Option<SocketAddr> {
        *self.lock_association()
    }

    /// Send a finalized packet as one datagram to the associated peer.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        if !packet.is_finalized() {
            return Err(TransportError::Unframed);
        }
        let remote = self.association().ok_or(TransportError::NotConnected)?;
        let sent = self.socket.send_to(packet.as_bytes(), remote).await?;
        debug!(slot = self.slot, %remote, len = sent, "datagram sent");
        Ok(())
    }

    /// Forget the associated peer. Idempotent.
    pub fn disconnect(&self) -> bool {
        let previous = self.lock_association().take();
        if let Some(remote) = previous {
            debug!(slot = self.slot, %remote, "datagram association cleared");
        }
        previous.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.lock_association().is_some()
    }

    fn lock_association(&self) -> MutexGuard<'_, Option<SocketAddr>> {
        self.association
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
