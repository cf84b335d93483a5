//! Stream and datagram channels for slotnet client slots.
//!
//! Each slot owns one [`StreamChannel`] (a TCP connection with its own
//! receive task and reassembly state) and one [`DatagramChannel`] (an
//! association on the UDP socket shared by the whole pool). [`Channel`]
//! lets callers address either one through the same capability set.

pub mod channel;
pub mod datagram;
pub mod error;
pub mod inbound;
pub mod socket;
pub mod stream;

pub use channel::Channel;
pub use datagram::DatagramChannel;
pub use error::{Result, TransportError};
pub use inbound::{InboundSink, SlotId, TransportKind};
pub use socket::{bind_datagram_socket, bind_stream_listener, configure_stream, DEFAULT_BUFFER_SIZE};
pub use stream::StreamChannel;
