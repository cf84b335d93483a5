//! Multi-client server built on slotnet channels and lanes.
//!
//! A [`Server`] owns a fixed [`SlotPool`], a [`HandlerRegistry`] and a
//! [`LaneScheduler`](slotnet_lanes::LaneScheduler). Frames read by either
//! transport are dispatched as work on the inbound lane to the handler
//! registered for their packet type; the [`cast`] helpers send replies.

pub mod cast;
pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod pool;
pub mod registry;
pub mod server;

pub use config::ServerConfig;
pub use connector::{DatagramClient, StreamClient};
pub use dispatch::{dispatch_frame, Dispatcher};
pub use error::{Result, ServerError};
pub use listener::{handle_datagram, DatagramOutcome, MAX_DATAGRAM_SIZE};
pub use pool::{ClientSlot, SlotPool, UserProfile};
pub use registry::{HandlerRegistry, PacketHandler};
pub use server::Server;
