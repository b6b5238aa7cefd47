//! The small slice of the `Configuration` phase (introduced in protocol
//! 1.20.2) the proxy must recognize by id: the two directions of
//! "finish configuration", which mark the Config→Play transition on each
//! side.

use std::io::Write;

use crate::{Decode, Encode};

#[derive(Clone, Debug, Default)]
pub struct FinishConfigurationS2c;

impl Encode for FinishConfigurationS2c {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<'a> Decode<'a> for FinishConfigurationS2c {
    fn decode(_r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(FinishConfigurationS2c)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FinishConfigurationC2s;

impl Encode for FinishConfigurationC2s {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<'a> Decode<'a> for FinishConfigurationC2s {
    fn decode(_r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(FinishConfigurationC2s)
    }
}
