//! Primitive wire encodings.
//!
//! Every multi-byte value is little-endian. `bool` is exactly one byte.
//! Strings are an `i32` byte length followed by that many ASCII bytes; any
//! character outside the ASCII range is written (and read back) as `?`.

use bytes::{BufMut, BytesMut};

use crate::error::{PacketError, Result};

/// Placeholder byte for characters that do not fit the single-byte encoding.
pub const REPLACEMENT: u8 = b'?';

/// A value that can be appended to a packet's write buffer.
pub trait Encode {
    /// Append the wire encoding of `self` to `dst`.
    fn encode(&self, dst: &mut BytesMut);
}

/// A value that can be decoded from the unread part of a packet.
pub trait Decode: Sized {
    /// Decode a value from the front of `src`.
    ///
    /// Returns the value and the number of bytes it occupied on the wire.
    /// Fails with [`PacketError::Underrun`] when `src` is shorter than the
    /// encoding requires.
    fn decode(src: &[u8]) -> Result<(Self, usize)>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, dst: &mut BytesMut) {
        (**self).encode(dst)
    }
}

fn take<const N: usize>(src: &[u8]) -> Result<[u8; N]> {
    src.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(PacketError::Underrun {
            needed: N,
            remaining: src.len(),
        })
}

macro_rules! fixed_width {
    ($ty:ty, $width:literal, $put:ident) => {
        impl Encode for $ty {
            fn encode(&self, dst: &mut BytesMut) {
                dst.$put(*self);
            }
        }

        impl Decode for $ty {
            fn decode(src: &[u8]) -> Result<(Self, usize)> {
                Ok((<$ty>::from_le_bytes(take::<$width>(src)?), $width))
            }
        }
    };
}

fixed_width!(u8, 1, put_u8);
fixed_width!(i16, 2, put_i16_le);
fixed_width!(i32, 4, put_i32_le);
fixed_width!(i64, 8, put_i64_le);
fixed_width!(f32, 4, put_f32_le);

impl Encode for bool {
    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(u8::from(*self));
    }
}

impl Decode for bool {
    fn decode(src: &[u8]) -> Result<(Self, usize)> {
        let [byte] = take::<1>(src)?;
        Ok((byte != 0, 1))
    }
}

impl Encode for str {
    fn encode(&self, dst: &mut BytesMut) {
        let len = self.chars().count();
        dst.reserve(4 + len);
        dst.put_i32_le(i32::try_from(len).unwrap_or(i32::MAX));
        for ch in self.chars() {
            dst.put_u8(if ch.is_ascii() { ch as u8 } else { REPLACEMENT });
        }
    }
}

impl Encode for String {
    fn encode(&self, dst: &mut BytesMut) {
        self.as_str().encode(dst)
    }
}

impl Decode for String {
    fn decode(src: &[u8]) -> Result<(Self, usize)> {
        let (len, prefix) = i32::decode(src)?;
        let len = usize::try_from(len).map_err(|_| PacketError::InvalidLength(len))?;
        let body = src
            .get(prefix..prefix + len)
            .ok_or(PacketError::Underrun {
                needed: prefix + len,
                remaining: src.len(),
            })?;
        let text = body
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { REPLACEMENT as char })
            .collect();
        Ok((text, prefix + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: Encode>(value: T) -> BytesMut {
        let mut dst = BytesMut::new();
        value.encode(&mut dst);
        dst
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(encoded(0x0102_0304i32).as_ref(), &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(encoded(0x0102i16).as_ref(), &[0x02, 0x01]);
        assert_eq!(encoded(1i64).as_ref(), &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn bool_is_one_byte() {
        assert_eq!(encoded(true).as_ref(), &[1]);
        assert_eq!(encoded(false).as_ref(), &[0]);
        assert_eq!(bool::decode(&[7]).unwrap(), (true, 1));
    }

    #[test]
    fn string_has_length_prefix_and_no_terminator() {
        assert_eq!(encoded("hi").as_ref(), &[2, 0, 0, 0, b'h', b'i']);
        assert_eq!(encoded("").as_ref(), &[0, 0, 0, 0]);
    }

    #[test]
    fn non_ascii_characters_become_placeholders() {
        let wire = encoded("né");
        assert_eq!(wire.as_ref(), &[2, 0, 0, 0, b'n', b'?']);

        let (text, used) = String::decode(&[1, 0, 0, 0, 0xE9]).unwrap();
        assert_eq!(text, "?");
        assert_eq!(used, 5);
    }

    #[test]
    fn negative_string_length_is_rejected() {
        let err = String::decode(&(-1i32).to_le_bytes()).unwrap_err();
        assert!(matches!(err, PacketError::InvalidLength(-1)));
    }

    #[test]
    fn short_string_body_is_underrun() {
        let err = String::decode(&[3, 0, 0, 0, b'a']).unwrap_err();
        assert!(matches!(
            err,
            PacketError::Underrun {
                needed: 7,
                remaining: 5
            }
        ));
    }
}
