use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};
use crate::wire::{Decode, Encode};

/// Size of the `i32` length prefix that leads every frame on the wire.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// A sequential packet buffer.
///
/// Producers append values to the write buffer and call
/// [`finalize_length_prefix`](Packet::finalize_length_prefix) before handing
/// the packet to a transport. Consumers read values from an immutable
/// snapshot of the write buffer, advancing a cursor.
///
/// Writes made after [`snapshot`](Packet::snapshot) are not visible to reads
/// until the snapshot is retaken.
#[derive(Debug, Default, Clone)]
pub struct Packet {
    write_buf: BytesMut,
    read_buf: Bytes,
    cursor: usize,
    finalized: bool,
    /// Content lives only in `read_buf` until the first write.
    received: bool,
    /// `write_buf` changed since the last snapshot.
    stale: bool,
}

impl Packet {
    /// Create an empty packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a packet whose body starts with a packet-type id.
    pub fn with_type(packet_type: i32) -> Self {
        let mut packet = Self::new();
        packet.write(packet_type);
        packet
    }

    /// Create a packet already populated with received bytes.
    ///
    /// The snapshot is taken immediately, so the packet is ready for reads.
    /// The bytes are not copied unless the packet is written to.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            read_buf: data.into(),
            received: true,
            ..Self::default()
        }
    }

    /// Append the wire encoding of `value`.
    pub fn write<T: Encode>(&mut self, value: T) -> &mut Self {
        value.encode(self.write_buf_mut());
        self
    }

    /// Append raw bytes without a length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_buf_mut().put_slice(bytes);
        self
    }

    /// Materialize the read buffer from the current write buffer.
    pub fn snapshot(&mut self) {
        if self.stale {
            self.read_buf = Bytes::copy_from_slice(&self.write_buf);
            self.stale = false;
        }
        self.cursor = self.cursor.min(self.read_buf.len());
    }

    /// Decode the next value and advance the cursor past it.
    pub fn read<T: Decode>(&mut self) -> Result<T> {
        self.read_with(true)
    }

    /// Decode the next value without moving the cursor.
    pub fn peek<T: Decode>(&self) -> Result<T> {
        T::decode(self.unread()).map(|(value, _)| value)
    }

    /// Decode the next value, advancing the cursor only when `advance` is set.
    pub fn read_with<T: Decode>(&mut self, advance: bool) -> Result<T> {
        let (value, used) = T::decode(self.unread())?;
        if advance {
            self.cursor += used;
        }
        Ok(value)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        let remaining = self.unread_len();
        if remaining < len {
            return Err(PacketError::Underrun {
                needed: len,
                remaining,
            });
        }
        let bytes = self.read_buf.slice(self.cursor..self.cursor + len);
        self.cursor += len;
        Ok(bytes)
    }

    /// Move the cursor forward by `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(drop)
    }

    /// All unread bytes of the snapshot, without moving the cursor.
    pub fn remaining(&self) -> Bytes {
        self.read_buf.slice(self.cursor..)
    }

    /// Number of snapshot bytes not yet read.
    pub fn unread_len(&self) -> usize {
        self.read_buf.len() - self.cursor
    }

    /// Current read position inside the snapshot.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length of the write buffer.
    pub fn len(&self) -> usize {
        self.written().len()
    }

    pub fn is_empty(&self) -> bool {
        self.written().is_empty()
    }

    /// Insert the `i32` length prefix at the front of the write buffer.
    ///
    /// The prefix equals the write-buffer size before insertion. Must be
    /// called exactly once, after the last write and before sending.
    pub fn finalize_length_prefix(&mut self) -> Result<()> {
        if self.finalized {
            return Err(PacketError::AlreadyFinalized);
        }
        let size = self.len();
        let prefix = i32::try_from(size).map_err(|_| PacketError::TooLarge { size })?;

        let mut framed = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + size);
        framed.put_i32_le(prefix);
        framed.put_slice(self.written());
        self.write_buf = framed;
        self.received = false;
        self.stale = true;
        self.finalized = true;
        Ok(())
    }

    /// Whether the length prefix has been inserted.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The full write buffer, as it would go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        self.written()
    }

    /// Wire bytes of a finalized packet, cheap to hand to several channels.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if !self.finalized {
            return Err(PacketError::NotFinalized);
        }
        Ok(Bytes::copy_from_slice(self.written()))
    }

    /// Clear the write buffer, snapshot and cursor.
    pub fn reset(&mut self) {
        self.write_buf.clear();
        self.read_buf = Bytes::new();
        self.cursor = 0;
        self.finalized = false;
        self.received = false;
        self.stale = false;
    }

    fn written(&self) -> &[u8] {
        if self.received {
            &self.read_buf
        } else {
            &self.write_buf
        }
    }

    fn write_buf_mut(&mut self) -> &mut BytesMut {
        if self.received {
            self.write_buf = BytesMut::from(self.read_buf.as_ref());
            self.received = false;
        }
        self.stale = true;
        &mut self.write_buf
    }

    fn unread(&self) -> &[u8] {
        &self.read_buf[self.cursor..]
    }
}
