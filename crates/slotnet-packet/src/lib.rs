//! Packet buffer and length-prefixed framing for slotnet.
//!
//! Every packet on the wire is:
//!
//! ```text
//! ┌──────────────────┬────────────────┬──────────────────┐
//! │ Length (i32 LE)  │ Type (i32 LE)  │ Payload          │
//! │ bytes that follow│                │                  │
//! └──────────────────┴────────────────┴──────────────────┘
//! ```
//!
//! [`Packet`] builds and reads packets, [`Reassembler`] recovers frames from
//! arbitrarily chunked input, and [`PacketCodec`] plugs both into
//! `tokio_util::codec::Framed`. Nothing in this crate performs I/O.

pub mod codec;
pub mod error;
pub mod framing;
pub mod packet;
pub mod wire;

pub use codec::PacketCodec;
pub use error::{PacketError, Result};
pub use framing::{split_datagram, Frame, Reassembler, DEFAULT_MAX_FRAME};
pub use packet::{Packet, LENGTH_PREFIX_SIZE};
pub use wire::{Decode, Encode};
