use std::sync::Arc;

use slotnet_lanes::{LaneScheduler, INBOUND_LANE};
use slotnet_packet::Frame;
use slotnet_transport::{InboundSink, SlotId, TransportKind};
use tracing::{error, trace, warn};

use crate::error::{Result, ServerError};
use crate::pool::SlotPool;
use crate::registry::HandlerRegistry;

/// Run the handler registered for `frame`'s packet type.
///
/// The handler receives a packet positioned just past the type id.
pub fn dispatch_frame(registry: &HandlerRegistry, slot: SlotId, frame: Frame) -> Result<()> {
    let mut packet = frame.into_packet();
    let packet_type = packet.read::<i32>()?;
    let handler = registry
        .get(packet_type)
        .ok_or(ServerError::UnknownPacketType(packet_type))?;
    handler(slot, packet);
    Ok(())
}

/// Routes everything the channels receive into the server.
///
/// Frames become work items on the inbound lane; a closed stream
/// disconnects its slot.
#[derive(Debug)]
pub struct Dispatcher {
    pool: Arc<SlotPool>,
    scheduler: Arc<LaneScheduler>,
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<SlotPool>,
        scheduler: Arc<LaneScheduler>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            pool,
            scheduler,
            registry,
        }
    }
}

impl InboundSink for Dispatcher {
    fn on_frame(&self, slot: SlotId, kind: TransportKind, frame: Frame) {
        trace!(slot, %kind, len = frame.len(), "frame received");
        let registry = Arc::clone(&self.registry);
        let queued = self.scheduler.request_work(INBOUND_LANE, move || {
            if let Err(err) = dispatch_frame(&registry, slot, frame) {
                error!(slot, %kind, error = %err, "dropping packet");
            }
        });
        if let Err(err) = queued {
            warn!(slot, %kind, error = %err, "inbound lane rejected frame");
        }
    }

    fn on_stream_closed(&self, slot: SlotId, generation: u64) {
        match self.pool.get(slot) {
            Some(client) => {
                client.disconnect_generation(generation);
            }
            None => warn!(slot, "close reported for unknown slot"),
        }
    }
}
