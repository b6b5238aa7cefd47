//! The single packet legal in the `Handshake` state. Its id is `0x00` in
//! every protocol revision this proxy supports, so it needs no entry in the
//! version-ranged registry.

use std::io::Write;

use anyhow::{bail, ensure};

use crate::bounded::Bounded;
use crate::var_int::VarInt;
use crate::{Decode, Encode};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
    Transfer,
}

impl TryFrom<i32> for NextState {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> anyhow::Result<Self> {
        match value {
            1 => Ok(NextState::Status),
            2 => Ok(NextState::Login),
            3 => Ok(NextState::Transfer),
            other => bail!("invalid handshake next_state {other}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandshakeC2s {
    pub protocol_version: i32,
    /// The raw hostname the client dialed, not yet stripped of the
    /// forwarding-payload suffixes the router normalizes away.
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl Encode for HandshakeC2s {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.protocol_version).encode(&mut w)?;
        Bounded::<&str, 255>(&self.server_address).encode(&mut w)?;
        self.server_port.encode(&mut w)?;
        let next: i32 = match self.next_state {
            NextState::Status => 1,
            NextState::Login => 2,
            NextState::Transfer => 3,
        };
        VarInt(next).encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for HandshakeC2s {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let protocol_version = VarInt::decode(r)?.0;
        let server_address = Bounded::<String, 255>::decode(r)?.0;
        let server_port = u16::decode(r)?;
        let next_state = NextState::try_from(VarInt::decode(r)?.0)?;
        ensure!(
            protocol_version >= -1,
            "implausible protocol version {protocol_version}"
        );
        Ok(HandshakeC2s {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let pkt = HandshakeC2s {
            protocol_version: 765,
            server_address: "lobby.example.com".to_owned(),
            server_port: 25565,
            next_state: NextState::Login,
        };
        let mut buf = Vec::new();
        pkt.encode(&mut buf).unwrap();
        let mut r = buf.as_slice();
        let decoded = HandshakeC2s::decode(&mut r).unwrap();
        assert_eq!(decoded.protocol_version, 765);
        assert_eq!(decoded.server_address, "lobby.example.com");
        assert_eq!(decoded.server_port, 25565);
        assert_eq!(decoded.next_state, NextState::Login);
        assert!(r.is_empty());
    }
}
