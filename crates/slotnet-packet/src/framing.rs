use bytes::{Buf, Bytes, BytesMut};
use tracing::warn;

use crate::error::{PacketError, Result};
use crate::packet::{Packet, LENGTH_PREFIX_SIZE};
use crate::wire::Decode;

/// Default maximum frame body size: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// One complete frame: the bytes that followed a length prefix.
///
/// The body starts with the `i32` packet-type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Frame body, packet-type id included.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Packet-type id from the first four body bytes.
    pub fn packet_type(&self) -> Result<i32> {
        i32::decode(&self.payload).map(|(id, _)| id)
    }

    /// A readable packet positioned at the start of the body.
    pub fn into_packet(self) -> Packet {
        Packet::from_bytes(self.payload)
    }

    /// The wire size of this frame (length prefix + body).
    pub fn wire_size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.payload.len()
    }
}

/// Turns an arbitrary sequence of received chunks back into frames.
///
/// Chunks may split a frame anywhere, including inside its length field.
/// A partial frame is kept, length field included, until the rest arrives.
/// A length field `<= 0` (or above the configured maximum) discards every
/// buffered byte.
///
/// Received bytes accumulate in one buffer and complete frames are split off
/// its front, so each byte is copied once no matter how it was chunked.
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    max_frame: usize,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame,
        }
    }

    /// Append a received chunk and return every frame it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, buffered = self.buffer.len(), "discarding reassembly state");
                    self.buffer.clear();
                    break;
                }
            }
        }
        frames
    }

    /// Bytes held back for a frame that has not fully arrived.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.buffer.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let (len, _) = i32::decode(&self.buffer)?;
        if len <= 0 {
            return Err(PacketError::InvalidLength(len));
        }
        let len = len as usize;
        if len > self.max_frame {
            return Err(PacketError::TooLarge { size: len });
        }
        if self.buffer.len() - LENGTH_PREFIX_SIZE < len {
            return Ok(None);
        }

        self.buffer.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(Frame::new(self.buffer.split_to(len).freeze())))
    }
}

/// Split one datagram body into its frames.
///
/// Datagrams are self-contained, so a trailing partial frame is dropped.
pub fn split_datagram(body: &[u8]) -> Vec<Frame> {
    let mut reassembler = Reassembler::new();
    let frames = reassembler.feed(body);
    if reassembler.buffered() > 0 {
        warn!(trailing = reassembler.buffered(), "datagram ends with a partial frame");
    }
    frames
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bytes::BufMut;

    use super::*;

    fn wire(packet_type: i32, body: &[u8]) -> Vec<u8> {
        let mut packet = Packet::with_type(packet_type);
        packet.write_bytes(body);
        packet.finalize_length_prefix().unwrap();
        packet.as_bytes().to_vec()
    }

    fn stream_of(frames: &[(i32, &[u8])]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(ty, body)| wire(*ty, body))
            .collect()
    }

    #[test]
    fn single_chunk_with_two_frames() {
        let bytes = stream_of(&[(1, b"abcd".as_slice()), (2, b"".as_slice())]);
        let frames = Reassembler::new().feed(&bytes);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].packet_type().unwrap(), 1);
        assert_eq!(&frames[0].payload()[4..], b"abcd");
        assert_eq!(frames[1].packet_type().unwrap(), 2);
        assert_eq!(frames[1].len(), 4);
    }

    #[test]
    fn every_split_point_yields_the_same_frames() {
        let bytes = stream_of(&[(1, b"hello".as_slice()), (7, b"x".as_slice()), (3, b"world!!".as_slice())]);
        let expected = Reassembler::new().feed(&bytes);
        assert_eq!(expected.len(), 3);

        for first in 0..=bytes.len() {
            for second in first..=bytes.len() {
                let mut reassembler = Reassembler::new();
                let mut frames = reassembler.feed(&bytes[..first]);
                frames.extend(reassembler.feed(&bytes[first..second]));
                frames.extend(reassembler.feed(&bytes[second..]));

                assert_eq!(frames, expected, "split at {first}/{second}");
                assert_eq!(reassembler.buffered(), 0);
            }
        }
    }

    #[test]
    fn zero_length_stop_at_every_split_point() {
        let lead = [3, 0, 0, 0, b'a', b'b', b'c'];
        let trailing_body = [0xFF; 10];
        let mut bytes = lead.to_vec();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let trailing_at = bytes.len();
        bytes.extend_from_slice(&10i32.to_le_bytes());
        bytes.extend_from_slice(&trailing_body);

        let lead_frame = Frame::new(Bytes::copy_from_slice(&lead[4..]));
        let trailing_frame = Frame::new(Bytes::copy_from_slice(&trailing_body));

        for first in 0..=bytes.len() {
            for second in first..=bytes.len() {
                let mut reassembler = Reassembler::new();
                let mut frames = reassembler.feed(&bytes[..first]);
                frames.extend(reassembler.feed(&bytes[first..second]));
                frames.extend(reassembler.feed(&bytes[second..]));

                // The trailing frame survives only when a chunk boundary falls
                // right after the zero length field.
                let mut expected = vec![lead_frame.clone()];
                if first == trailing_at || second == trailing_at {
                    expected.push(trailing_frame.clone());
                }
                assert_eq!(frames, expected, "split at {first}/{second}");
            }
        }
    }

    #[test]
    fn multi_mebibyte_frame_in_small_chunks() {
        const BODY: usize = 8 * 1024 * 1024;
        let mut bytes = Vec::with_capacity(LENGTH_PREFIX_SIZE + BODY + 8);
        bytes.extend_from_slice(&(BODY as i32).to_le_bytes());
        bytes.extend((0..BODY).map(|i| (i % 251) as u8));
        bytes.extend_from_slice(&wire(2, b"".as_slice()));

        let mut reassembler = Reassembler::new();
        let mut frames = Vec::new();
        let started = Instant::now();
        for chunk in bytes.chunks(4096) {
            frames.extend(reassembler.feed(chunk));
        }
        let elapsed = started.elapsed();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), BODY);
        assert!(frames[0]
            .payload()
            .iter()
            .enumerate()
            .all(|(i, b)| *b == (i % 251) as u8));
        assert_eq!(frames[1].packet_type().unwrap(), 2);
        assert_eq!(reassembler.buffered(), 0);
        assert!(
            elapsed < Duration::from_secs(3),
            "reassembly took {elapsed:?}"
        );
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let bytes = stream_of(&[(9, b"slow".as_slice()), (10, b"drip".as_slice())]);
        let mut reassembler = Reassembler::new();
        let mut frames = Vec::new();
        for byte in &bytes {
            frames.extend(reassembler.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].packet_type().unwrap(), 10);
    }

    #[test]
    fn partial_frame_keeps_its_length_field() {
        let bytes = wire(1, b"abcdef".as_slice());
        let mut reassembler = Reassembler::new();

        assert!(reassembler.feed(&bytes[..6]).is_empty());
        assert_eq!(reassembler.buffered(), 6);

        let frames = reassembler.feed(&bytes[6..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].wire_size(), bytes.len());
    }

    #[test]
    fn leftover_tail_is_exact() {
        let mut bytes = wire(1, b"one".as_slice());
        let second = wire(2, b"two".as_slice());
        bytes.extend_from_slice(&second[..5]);

        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.feed(&bytes).len(), 1);
        assert_eq!(reassembler.buffered(), 5);

        let frames = reassembler.feed(&second[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].packet_type().unwrap(), 2);
    }

    #[test]
    fn non_positive_length_discards_everything() {
        let mut bytes = wire(1, b"ok".as_slice());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&wire(2, b"lost".as_slice()));

        let mut reassembler = Reassembler::new();
        let frames = reassembler.feed(&bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(reassembler.buffered(), 0);

        let mut negative = BytesMut::new();
        negative.put_i32_le(-5);
        negative.put_slice(b"junk");
        assert!(reassembler.feed(&negative).is_empty());
        assert_eq!(reassembler.buffered(), 0);

        // Recovers once clean frames arrive again.
        assert_eq!(reassembler.feed(&wire(3, b"".as_slice())).len(), 1);
    }

    #[test]
    fn oversized_length_discards_everything() {
        let mut reassembler = Reassembler::with_max_frame(8);
        let mut bytes = BytesMut::new();
        bytes.put_i32_le(9);
        bytes.put_slice(&[0; 9]);

        assert!(reassembler.feed(&bytes).is_empty());
        assert_eq!(reassembler.buffered(), 0);
    }

    #[test]
    fn split_datagram_drops_trailing_partial() {
        let mut body = stream_of(&[(4, b"a".as_slice()), (5, b"b".as_slice())]);
        body.extend_from_slice(&[3, 0]);

        let frames = split_datagram(&body);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].packet_type().unwrap(), 4);
    }

    #[test]
    fn frame_into_packet_reads_type_then_body() {
        let frames = Reassembler::new().feed(&wire(1, &[1, 2, 3, 4]));
        let mut packet = frames[0].clone().into_packet();

        assert_eq!(packet.read::<i32>().unwrap(), 1);
        assert_eq!(packet.read_bytes(4).unwrap().as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn packet_type_of_short_frame_is_underrun() {
        let frame = Frame::new(Bytes::from_static(&[1, 2]));
        assert!(matches!(
            frame.packet_type(),
            Err(PacketError::Underrun { needed: 4, remaining: 2 })
        ));
    }
}
