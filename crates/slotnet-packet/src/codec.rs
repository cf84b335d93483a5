use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::PacketError;
use crate::framing::{Frame, Reassembler, DEFAULT_MAX_FRAME};
use crate::packet::Packet;

/// `tokio-util` codec for length-prefixed packets.
///
/// Decoding goes through a [`Reassembler`], so a stream that carries a
/// non-positive length field drops the buffered bytes and keeps going.
/// Encoding inserts the length prefix when the packet does not carry one yet.
#[derive(Debug)]
pub struct PacketCodec {
    reassembler: Reassembler,
    pending: VecDeque<Frame>,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketCodec {
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            reassembler: Reassembler::with_max_frame(max_frame),
            pending: VecDeque::new(),
        }
    }
}

impl Decoder for PacketCodec {
    type Item = Frame;
    type Error = PacketError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_empty() && !src.is_empty() {
            let chunk = src.split();
            self.pending.extend(self.reassembler.feed(&chunk));
        }
        Ok(self.pending.pop_front())
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = PacketError;

    fn encode(&mut self, mut item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if !item.is_finalized() {
            item.finalize_length_prefix()?;
        }
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
