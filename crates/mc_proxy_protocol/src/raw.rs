//! The passthrough type used for any packet body the proxy does not
//! interpret: it simply borrows the remaining bytes so they can be
//! re-framed and forwarded untouched.

use std::io::Write;
use std::mem;

use crate::{Decode, Encode};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RawBytes<'a>(pub &'a [u8]);

impl Encode for RawBytes<'_> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        w.write_all(self.0)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for RawBytes<'a> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(RawBytes(mem::take(r)))
    }
}
