use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use slotnet_transport::{
    Channel, DatagramChannel, InboundSink, SlotId, StreamChannel, TransportKind,
};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, info};

use crate::error::{Result, ServerError};

/// Identity attached to a slot while a client is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
}

/// One potential client: a fixed identity plus both transport channels.
#[derive(Debug)]
pub struct ClientSlot {
    id: SlotId,
    stream: StreamChannel,
    datagram: DatagramChannel,
    profile: Mutex<Option<UserProfile>>,
}

impl ClientSlot {
    fn new(id: SlotId, buffer_size: usize, socket: Arc<UdpSocket>) -> Self {
        Self {
            id,
            stream: StreamChannel::with_buffer_size(id, buffer_size),
            datagram: DatagramChannel::new(id, socket),
            profile: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn stream(&self) -> &StreamChannel {
        &self.stream
    }

    pub fn datagram(&self) -> &DatagramChannel {
        &self.datagram
    }

    pub fn channel(&self, kind: TransportKind) -> Channel<'_> {
        match kind {
            TransportKind::Stream => Channel::Stream(&self.stream),
            TransportKind::Datagram => Channel::Datagram(&self.datagram),
        }
    }

    /// A slot is free exactly when its stream channel has no connection.
    pub fn is_free(&self) -> bool {
        !self.stream.is_connected()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.lock_profile().clone()
    }

    pub fn set_profile(&self, profile: UserProfile) {
        *self.lock_profile() = Some(profile);
    }

    /// Clear the profile and tear down both channels. The slot stays in the pool.
    pub fn disconnect(&self) -> bool {
        let had_stream = self.stream.disconnect();
        self.finish_disconnect();
        had_stream
    }

    /// Disconnect only if the stream connection is still `generation`.
    pub(crate) fn disconnect_generation(&self, generation: u64) -> bool {
        if !self.stream.disconnect_generation(generation) {
            debug!(slot = self.id, generation, "ignoring close of a replaced connection");
            return false;
        }
        self.finish_disconnect();
        true
    }

    fn finish_disconnect(&self) {
        self.datagram.disconnect();
        self.lock_profile().take();
    }

    fn lock_profile(&self) -> MutexGuard<'_, Option<UserProfile>> {
        self.profile.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-capacity set of client slots, all created up front.
#[derive(Debug)]
pub struct SlotPool {
    slots: Vec<ClientSlot>,
    claim: Mutex<()>,
}

impl SlotPool {
    /// Create `capacity` idle slots sharing one datagram socket.
    pub fn new(capacity: usize, buffer_size: usize, socket: Arc<UdpSocket>) -> Self {
        let slots = (0..capacity)
            .map(|id| ClientSlot::new(id, buffer_size, Arc::clone(&socket)))
            .collect();
        debug!(capacity, "slot pool created");
        Self {
            slots,
            claim: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, id: SlotId) -> Option<&ClientSlot> {
        self.slots.get(id)
    }

    pub fn slot(&self, id: SlotId) -> Result<&ClientSlot> {
        self.get(id).ok_or(ServerError::UnknownSlot(id))
    }

    pub fn slots(&self) -> impl Iterator<Item = &ClientSlot> {
        self.slots.iter()
    }

    /// Number of slots with a live stream connection.
    pub fn connected(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }

    /// Bind an accepted stream to the first free slot.
    ///
    /// Claims are serialized, so two concurrent accepts never pick the same
    /// slot. When every slot is taken the stream is dropped, which closes it.
    /// A datagram association left on the slot from before the claim belongs
    /// to someone else and is cleared.
    pub fn claim(&self, stream: TcpStream, sink: Arc<dyn InboundSink>) -> Result<SlotId> {
        let _claim = self.claim.lock().unwrap_or_else(PoisonError::into_inner);

        let slot = self
            .slots
            .iter()
            .find(|slot| slot.is_free())
            .ok_or(ServerError::CapacityExceeded {
                capacity: self.capacity(),
            })?;

        slot.datagram.disconnect();
        let peer = slot.stream.connect(stream, sink)?;
        info!(slot = slot.id, %peer, "client bound to slot");
        Ok(slot.id)
    }

    /// Disconnect a slot by identity.
    pub fn disconnect(&self, id: SlotId) -> Result<bool> {
        Ok(self.slot(id)?.disconnect())
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        for slot in &self.slots {
            slot.disconnect();
        }
    }
}
