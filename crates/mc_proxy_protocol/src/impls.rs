//! `Encode`/`Decode` implementations for the primitive wire types used by
//! every packet body: big-endian integers, booleans, length-prefixed
//! strings and byte arrays, UUIDs, and NBT compounds.

use std::io::Write;

use anyhow::{bail, ensure};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::var_int::VarInt;
use crate::{Decode, Encode};

macro_rules! impl_primitive {
    ($t:ty, $read:ident, $write:ident) => {
        impl Encode for $t {
            fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
                w.$write::<BigEndian>(*self)?;
                Ok(())
            }
        }

        impl<'a> Decode<'a> for $t {
            fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
                Ok(r.$read::<BigEndian>()?)
            }
        }
    };
}

impl_primitive!(u16, read_u16, write_u16);
impl_primitive!(i16, read_i16, write_i16);
impl_primitive!(u32, read_u32, write_u32);
impl_primitive!(i32, read_i32, write_i32);
impl_primitive!(u64, read_u64, write_u64);
impl_primitive!(i64, read_i64, write_i64);
impl_primitive!(f32, read_f32, write_f32);
impl_primitive!(f64, read_f64, write_f64);

impl Encode for bool {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        w.write_u8(*self as u8)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for bool {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let v = u8::decode(r)?;
        ensure!(v == 0 || v == 1, "boolean value must be 0 or 1, got {v}");
        Ok(v == 1)
    }
}

impl Encode for u8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        w.write_u8(*self)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for u8 {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        ensure!(!r.is_empty(), "unexpected end of packet while reading u8");
        let v = r[0];
        *r = &r[1..];
        Ok(v)
    }
}

impl Encode for i8 {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        (*self as u8).encode(w)
    }
}

impl<'a> Decode<'a> for i8 {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(u8::decode(r)? as i8)
    }
}

/// Maximum length, in UTF-16 code units, of a string the proxy will ever
/// decode. No single protocol string (chat, server address, etc.) exceeds
/// this; it exists as a hard backstop against a maliciously large length
/// prefix.
const MAX_STRING_CHARS: i32 = 32767;

impl Encode for str {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.len() as i32).encode(&mut w)?;
        w.write_all(self.as_bytes())?;
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_str().encode(w)
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "negative string length");
        ensure!(
            len <= MAX_STRING_CHARS * 4,
            "string length {len} exceeds the maximum allowed"
        );
        ensure!(r.len() >= len as usize, "not enough data for string body");
        let (bytes, rest) = r.split_at(len as usize);
        *r = rest;
        Ok(std::str::from_utf8(bytes)?)
    }
}

impl<'a> Decode<'a> for String {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(<&str>::decode(r)?.to_owned())
    }
}

impl Encode for Uuid {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        w.write_all(self.as_bytes())?;
        Ok(())
    }
}

impl<'a> Decode<'a> for Uuid {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        ensure!(r.len() >= 16, "not enough data for UUID");
        let (bytes, rest) = r.split_at(16);
        *r = rest;
        Ok(Uuid::from_slice(bytes)?)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Some(v) => {
                true.encode(&mut w)?;
                v.encode(&mut w)
            }
            None => false.encode(w),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        if bool::decode(r)? {
            Ok(Some(T::decode(r)?))
        } else {
            Ok(None)
        }
    }
}

/// A byte slice prefixed with a `VarInt` length, the generic
/// "array of X" idiom used for property lists, plugin message payloads
/// whose size is self-describing, and the like.
impl<'a> Decode<'a> for &'a [u8] {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "negative byte array length");
        ensure!(r.len() >= len as usize, "not enough data for byte array body");
        let (bytes, rest) = r.split_at(len as usize);
        *r = rest;
        Ok(bytes)
    }
}

impl Encode for [u8] {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.len() as i32).encode(&mut w)?;
        w.write_all(self)?;
        Ok(())
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_slice().encode(w)
    }
}

impl<'a> Decode<'a> for Vec<u8> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(<&[u8]>::decode(r)?.to_vec())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.len() as i32).encode(&mut w)?;
        for item in self {
            item.encode(&mut w)?;
        }
        Ok(())
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "negative array length");
        ensure!(
            len <= 1 << 20,
            "array length {len} is unreasonably large"
        );
        let mut out = Vec::with_capacity(len.min(4096) as usize);
        for _ in 0..len {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}

/// Reads a binary NBT compound (uncompressed, as used on the wire since
/// 1.20.2; earlier versions are handled the same way since the proxy never
/// needs to interpret NBT contents, only skip past them).
pub fn read_nbt(r: &mut &[u8]) -> anyhow::Result<valence_nbt::Compound> {
    let (compound, _root_name) = valence_nbt::Compound::from_binary(r)
        .map_err(|e| anyhow::anyhow!("failed to decode NBT: {e}"))?;
    Ok(compound)
}

pub fn write_nbt(mut w: impl Write, compound: &valence_nbt::Compound) -> anyhow::Result<()> {
    compound.to_binary(&mut w, "")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<'a, T>(value: T, buf: &'a mut Vec<u8>) -> T
    where
        T: Encode + Decode<'a> + Clone,
    {
        value.clone().encode(&mut *buf).unwrap();
        let mut slice = buf.as_slice();
        let decoded = T::decode(&mut slice).unwrap();
        assert!(slice.is_empty());
        decoded
    }

    #[test]
    fn string_round_trip() {
        let mut buf = vec![];
        let s: String = "hello, minecraft".to_owned();
        let decoded = round_trip(s.clone(), &mut buf);
        assert_eq!(decoded, s);
    }

    #[test]
    fn uuid_round_trip() {
        let mut buf = vec![];
        let id = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        let decoded = round_trip(id, &mut buf);
        assert_eq!(decoded, id);
    }

    #[test]
    fn bool_rejects_invalid_byte() {
        let buf = [2u8];
        let mut slice = &buf[..];
        assert!(bool::decode(&mut slice).is_err());
    }

    #[test]
    fn vec_u8_round_trip() {
        let mut buf = vec![];
        let data = vec![1u8, 2, 3, 4, 5];
        let decoded = round_trip(data.clone(), &mut buf);
        assert_eq!(decoded, data);
    }
}
