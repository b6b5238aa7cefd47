//! Length-bounded wrapper used for fields the protocol caps at a fixed
//! maximum (usernames, server addresses, plugin channel payloads): encoding
//! rejects values over the limit, and decoding rejects a declared length
//! over the limit before it allocates anything.

use std::io::Write;
use std::ops::{Deref, DerefMut};

use anyhow::ensure;

use crate::raw::RawBytes;
use crate::var_int::VarInt;
use crate::{Decode, Encode};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Bounded<T, const MAX: usize>(pub T);

impl<T, const MAX: usize> Deref for Bounded<T, MAX> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T, const MAX: usize> DerefMut for Bounded<T, MAX> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const MAX: usize> Encode for Bounded<&str, MAX> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.0.chars().count() <= MAX,
            "string of {} chars exceeds the maximum of {MAX}",
            self.0.chars().count()
        );
        self.0.encode(w)
    }
}

impl<const MAX: usize> Encode for Bounded<String, MAX> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        Bounded::<&str, MAX>(&self.0).encode(w)
    }
}

impl<'a, const MAX: usize> Decode<'a> for Bounded<&'a str, MAX> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let s = <&str>::decode(r)?;
        ensure!(
            s.chars().count() <= MAX,
            "string of {} chars exceeds the maximum of {MAX}",
            s.chars().count()
        );
        Ok(Bounded(s))
    }
}

impl<'a, const MAX: usize> Decode<'a> for Bounded<String, MAX> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(Bounded(Bounded::<&str, MAX>::decode(r)?.0.to_owned()))
    }
}

impl<'a, const MAX: usize> Decode<'a> for Bounded<RawBytes<'a>, MAX> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        ensure!(
            r.len() <= MAX,
            "remaining data of {} bytes exceeds the maximum of {MAX}",
            r.len()
        );
        Ok(Bounded(RawBytes::decode(r)?))
    }
}

impl<const MAX: usize> Encode for Bounded<RawBytes<'_>, MAX> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.0 .0.len() <= MAX,
            "raw bytes of {} exceeds the maximum of {MAX}",
            self.0 .0.len()
        );
        self.0.encode(w)
    }
}

impl<T, const MAX: usize> Encode for Bounded<Vec<T>, MAX>
where
    T: Encode,
{
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.0.len() <= MAX,
            "array of {} elements exceeds the maximum of {MAX}",
            self.0.len()
        );
        VarInt(self.0.len() as i32).encode(&mut w)?;
        for item in &self.0 {
            item.encode(&mut w)?;
        }
        Ok(())
    }
}

impl<'a, T, const MAX: usize> Decode<'a> for Bounded<Vec<T>, MAX>
where
    T: Decode<'a>,
{
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "negative array length");
        ensure!(
            len as usize <= MAX,
            "array length {len} exceeds the maximum of {MAX}"
        );
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            out.push(T::decode(r)?);
        }
        Ok(Bounded(out))
    }
}
