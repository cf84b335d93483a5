//! Multi-client networking over TCP and UDP.
//!
//! slotnet serves a fixed pool of client slots. Each slot has a stream
//! channel and a datagram channel, and packets read from either are handed to
//! registered handlers through a small set of work lanes.
//!
//! # Crate Structure
//!
//! - [`packet`]: packet buffer, primitive encoding and length-prefixed framing
//! - [`transport`]: stream and datagram channels bound to slots
//! - [`lanes`]: two-stage work queue and lane scheduler
//! - [`server`]: slot pool, handler registry, dispatch and casting

/// Re-export packet types.
pub mod packet {
    pub use slotnet_packet::*;
}

/// Re-export transport types.
pub mod transport {
    pub use slotnet_transport::*;
}

/// Re-export lane types.
pub mod lanes {
    pub use slotnet_lanes::*;
}

/// Re-export server types.
pub mod server {
    pub use slotnet_server::*;
}
