//! Send-side helpers that address one, all, or all-but-some slots.
//!
//! Each helper inserts the packet's length prefix once (when missing) and then
//! writes the same bytes to every targeted channel. Per-channel failures are
//! logged and skipped; they never disconnect the slot.

use slotnet_packet::Packet;
use slotnet_transport::{SlotId, TransportKind};
use tracing::warn;

use crate::error::Result;
use crate::pool::SlotPool;

fn ensure_finalized(packet: &mut Packet) -> Result<()> {
    if !packet.is_finalized() {
        packet.finalize_length_prefix()?;
    }
    Ok(())
}

/// Send `packet` to one slot.
pub async fn unicast(
    pool: &SlotPool,
    kind: TransportKind,
    slot: SlotId,
    packet: &mut Packet,
) -> Result<()> {
    ensure_finalized(packet)?;
    pool.slot(slot)?.channel(kind).send(packet).await?;
    Ok(())
}

/// Send `packet` to every connected slot. Returns the number of deliveries.
pub async fn broadcast(pool: &SlotPool, kind: TransportKind, packet: &mut Packet) -> Result<usize> {
    multicast(pool, kind, packet, &[]).await
}

/// Send `packet` to every connected slot not listed in `exclude`.
///
/// Returns the number of deliveries.
pub async fn multicast(
    pool: &SlotPool,
    kind: TransportKind,
    packet: &mut Packet,
    exclude: &[SlotId],
) -> Result<usize> {
    ensure_finalized(packet)?;
    let packet: &Packet = packet;

    let mut delivered = 0;
    for slot in pool.slots().filter(|slot| !exclude.contains(&slot.id())) {
        let channel = slot.channel(kind);
        if !channel.is_connected() {
            continue;
        }
        match channel.send(packet).await {
            Ok(()) => delivered += 1,
            Err(err) => warn!(slot = slot.id(), %kind, error = %err, "cast to slot failed"),
        }
    }
    Ok(delivered)
}
