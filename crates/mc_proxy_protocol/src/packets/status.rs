//! The `Status` state: server list ping. Both packets on both sides are
//! stable across every supported protocol version.

use std::io::Write;

use crate::{Decode, Encode};

#[derive(Clone, Debug, Default)]
pub struct StatusRequestC2s;

impl Encode for StatusRequestC2s {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<'a> Decode<'a> for StatusRequestC2s {
    fn decode(_r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(StatusRequestC2s)
    }
}

#[derive(Clone, Debug)]
pub struct StatusResponseS2c {
    /// The full status JSON body (version, players, description, favicon),
    /// either passed through from the backend or synthesized by the proxy.
    pub json: String,
}

impl Encode for StatusResponseS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.json.encode(w)
    }
}

impl<'a> Decode<'a> for StatusResponseS2c {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(StatusResponseS2c {
            json: String::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct PingC2s {
    pub payload: i64,
}

impl Encode for PingC2s {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.payload.encode(w)
    }
}

impl<'a> Decode<'a> for PingC2s {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(PingC2s {
            payload: i64::decode(r)?,
        })
    }
}

pub type PongS2c = PingC2s;
