use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use slotnet_packet::Packet;
use slotnet_transport::SlotId;
use tracing::debug;

/// Callback for one packet type.
///
/// Receives the sending slot and the packet with its cursor just past the
/// packet-type id.
pub type PacketHandler = Arc<dyn Fn(SlotId, Packet) + Send + Sync>;

/// Packet-type id to handler map.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<i32, PacketHandler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("packet_types", &self.packet_types())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `packet_type`.
    ///
    /// An existing registration is kept; returns whether `handler` was added.
    pub fn register<F>(&self, packet_type: i32, handler: F) -> bool
    where
        F: Fn(SlotId, Packet) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&packet_type) {
            return false;
        }
        handlers.insert(packet_type, Arc::new(handler));
        debug!(packet_type, "handler registered");
        true
    }

    /// Remove the handler for `packet_type`, if any.
    pub fn unregister(&self, packet_type: i32) -> bool {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&packet_type)
            .is_some()
    }

    pub fn get(&self, packet_type: i32) -> Option<PacketHandler> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&packet_type)
            .cloned()
    }

    pub fn contains(&self, packet_type: i32) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&packet_type)
    }

    /// Registered packet types, sorted.
    pub fn packet_types(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn first_registration_wins() {
        let registry = HandlerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        assert!(registry.register(1, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!registry.register(1, |_, _| panic!("replaced handler must not run")));

        let handler = registry.get(1).expect("handler should be registered");
        handler(0, Packet::new());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_and_listing() {
        let registry = HandlerRegistry::new();
        registry.register(5, |_, _| {});
        registry.register(2, |_, _| {});

        assert_eq!(registry.packet_types(), vec![2, 5]);
        assert!(registry.unregister(5));
        assert!(!registry.unregister(5));
        assert!(!registry.contains(5));
        assert!(registry.get(5).is_none());
    }
}
