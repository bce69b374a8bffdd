//! Generic field codec.
//!
//! Message structs are sequences of fields; each field type implements
//! [`WireEncode`] and [`WireDecode`]. Composite messages get their impls from
//! the `wire_message!` macro, which simply encodes fields in declaration
//! order.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};

use crate::WireError;

/// Side-channel metadata map carried by most bodies (small key → string).
///
/// Well-known keys live in [`crate::messages::detail`].
pub type DetailMap = BTreeMap<u8, String>;

/// Types that can be appended to an outgoing body.
pub trait WireEncode {
    /// Append the encoded form of `self` to `buf`.
    fn encode(&self, buf: &mut BytesMut);
}

/// Types that can be read back from an incoming body.
pub trait WireDecode: Sized {
    /// Consume the encoded form of `Self` from the front of `buf`.
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError>;
}

/// Fail with `UnexpectedEof` unless `buf` holds at least `needed` bytes.
#[inline]
pub fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), WireError> {
    if buf.remaining() < needed {
        return Err(WireError::UnexpectedEof {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Length prefixes are `u16`, so no string exceeds 65535 bytes and no list
/// or map exceeds 65535 items on the wire. Longer collections keep their
/// first `u16::MAX` items.
#[inline]
pub fn checked_len(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

/// Longest prefix of `text` that fits a `u16` length and ends on a char
/// boundary, so the clamped string still decodes as UTF-8.
pub fn clamp_str(text: &str) -> &str {
    let mut end = text.len().min(usize::from(u16::MAX));
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

macro_rules! impl_int {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl WireEncode for $ty {
                fn encode(&self, buf: &mut BytesMut) {
                    buf.$put(*self);
                }
            }

            impl WireDecode for $ty {
                fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
                    ensure_remaining(buf, std::mem::size_of::<$ty>())?;
                    Ok(buf.$get())
                }
            }
        )*
    };
}

impl_int! {
    u8 => put_u8, get_u8;
    u16 => put_u16_le, get_u16_le;
    u32 => put_u32_le, get_u32_le;
    u64 => put_u64_le, get_u64_le;
    i32 => put_i32_le, get_i32_le;
}

impl WireEncode for bool {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(u8::from(*self));
    }
}

impl WireDecode for bool {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        Ok(u8::decode(buf)? != 0)
    }
}

impl WireEncode for String {
    fn encode(&self, buf: &mut BytesMut) {
        let text = clamp_str(self);
        buf.put_u16_le(checked_len(text.len()));
        buf.put_slice(text.as_bytes());
    }
}

impl WireDecode for String {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let len = usize::from(u16::decode(buf)?);
        ensure_remaining(buf, len)?;
        let mut raw = vec![0u8; len];
        buf.copy_to_slice(&mut raw);
        String::from_utf8(raw).map_err(|_| WireError::InvalidUtf8)
    }
}

// Vec<u8> goes through this impl too: a u16 count followed by the raw bytes.
impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        let count = checked_len(self.len());
        buf.put_u16_le(count);
        for item in self.iter().take(usize::from(count)) {
            item.encode(buf);
        }
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let count = usize::from(u16::decode(buf)?);
        // Every element needs at least one byte; refuse impossible counts
        // before allocating.
        ensure_remaining(buf, count.min(buf.remaining() + 1))?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

impl<K, V> WireEncode for BTreeMap<K, V>
where
    K: WireEncode,
    V: WireEncode,
{
    fn encode(&self, buf: &mut BytesMut) {
        let count = checked_len(self.len());
        buf.put_u16_le(count);
        for (key, value) in self.iter().take(usize::from(count)) {
            key.encode(buf);
            value.encode(buf);
        }
    }
}

impl<K, V> WireDecode for BTreeMap<K, V>
where
    K: WireDecode + Ord,
    V: WireDecode,
{
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let count = usize::from(u16::decode(buf)?);
        let mut map = BTreeMap::new();
        for _ in 0..count {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: WireEncode>(value: &T) -> BytesMut {
        let mut buf = BytesMut::new();
        value.encode(&mut buf);
        buf
    }

    #[test]
    fn test_integers_are_little_endian() {
        assert_eq!(&encode(&0x0102u16)[..], &[0x02, 0x01]);
        assert_eq!(&encode(&0x0102_0304u32)[..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_string_has_u16_length_prefix() {
        let buf = encode(&"ab".to_string());
        assert_eq!(&buf[..], &[2, 0, b'a', b'b']);
    }

    #[test]
    fn test_byte_vec_is_length_prefixed_raw_bytes() {
        let buf = encode(&vec![10u8, 0, 0, 1]);
        assert_eq!(&buf[..], &[4, 0, 10, 0, 0, 1]);
    }

    #[test]
    fn test_truncated_string_reports_eof() {
        let mut data: &[u8] = &[5, 0, b'a'];
        let err = String::decode(&mut data).unwrap_err();
        assert_eq!(
            err,
            WireError::UnexpectedEof {
                needed: 5,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut data: &[u8] = &[2, 0, 0xff, 0xfe];
        assert_eq!(String::decode(&mut data), Err(WireError::InvalidUtf8));
    }

    #[test]
    fn test_impossible_vec_count_rejected_without_allocating() {
        let mut data: &[u8] = &[0xff, 0xff, 1];
        assert!(matches!(
            Vec::<u32>::decode(&mut data),
            Err(WireError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_oversized_string_clamped_at_char_boundary() {
        let long = "é".repeat(40_000);
        let buf = encode(&long);
        let mut slice: &[u8] = &buf;
        let decoded = String::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        assert_eq!(decoded.len(), 65_534);
        assert!(long.starts_with(&decoded));
    }

    #[test]
    fn test_oversized_vec_keeps_leading_items() {
        let items: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        let buf = encode(&items);
        let mut slice: &[u8] = &buf;
        let decoded = Vec::<u8>::decode(&mut slice).unwrap();
        assert_eq!(decoded.len(), usize::from(u16::MAX));
        assert_eq!(&decoded[..], &items[..decoded.len()]);
    }

    #[test]
    fn test_detail_map_decodes_in_key_order() {
        let mut map = DetailMap::new();
        map.insert(9, "nine".into());
        map.insert(1, "one".into());
        let buf = encode(&map);
        let mut slice: &[u8] = &buf;
        let decoded = DetailMap::decode(&mut slice).unwrap();
        assert_eq!(decoded, map);
        assert!(slice.is_empty());
    }
}
