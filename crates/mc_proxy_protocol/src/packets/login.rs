//! The `Login` state packets the proxy must interpret on both the client
//! and backend side of a connection.

use std::io::Write;

use uuid::Uuid;

use crate::bounded::Bounded;
use crate::profile::Property;
use crate::raw::RawBytes;
use crate::var_int::VarInt;
use crate::{Decode, Encode};

#[derive(Clone, Debug)]
pub struct LoginHelloC2s {
    pub username: String,
    pub profile_id: Option<Uuid>,
}

impl Encode for LoginHelloC2s {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Bounded::<&str, 16>(&self.username).encode(&mut w)?;
        self.profile_id.encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginHelloC2s {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginHelloC2s {
            username: Bounded::<String, 16>::decode(r)?.0,
            profile_id: Option::<Uuid>::decode(r)?,
        })
    }
}

/// `EncryptionRequest`.
#[derive(Clone, Debug)]
pub struct LoginHelloS2c {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
    pub should_authenticate: bool,
}

impl Encode for LoginHelloS2c {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Bounded::<&str, 20>(&self.server_id).encode(&mut w)?;
        self.public_key.encode(&mut w)?;
        self.verify_token.encode(&mut w)?;
        self.should_authenticate.encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginHelloS2c {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginHelloS2c {
            server_id: Bounded::<String, 20>::decode(r)?.0,
            public_key: Vec::<u8>::decode(r)?,
            verify_token: Vec::<u8>::decode(r)?,
            should_authenticate: bool::decode(r)?,
        })
    }
}

/// `EncryptionResponse`.
#[derive(Clone, Debug)]
pub struct LoginKeyC2s {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Encode for LoginKeyC2s {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.shared_secret.encode(&mut w)?;
        self.verify_token.encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginKeyC2s {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginKeyC2s {
            shared_secret: Vec::<u8>::decode(r)?,
            verify_token: Vec::<u8>::decode(r)?,
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct LoginCompressionS2c {
    pub threshold: i32,
}

impl Encode for LoginCompressionS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        VarInt(self.threshold).encode(w)
    }
}

impl<'a> Decode<'a> for LoginCompressionS2c {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginCompressionS2c {
            threshold: VarInt::decode(r)?.0,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LoginSuccessS2c {
    pub uuid: Uuid,
    pub username: String,
    pub properties: Vec<Property>,
}

impl Encode for LoginSuccessS2c {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.uuid.encode(&mut w)?;
        Bounded::<&str, 16>(&self.username).encode(&mut w)?;
        self.properties.encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginSuccessS2c {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginSuccessS2c {
            uuid: Uuid::decode(r)?,
            username: Bounded::<String, 16>::decode(r)?.0,
            properties: Vec::<Property>::decode(r)?,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoginAcknowledgedC2s;

impl Encode for LoginAcknowledgedC2s {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginAcknowledgedC2s {
    fn decode(_r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginAcknowledgedC2s)
    }
}

#[derive(Clone, Debug)]
pub struct LoginDisconnectS2c {
    /// Chat-component JSON reason.
    pub reason: String,
}

impl Encode for LoginDisconnectS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.reason.encode(w)
    }
}

impl<'a> Decode<'a> for LoginDisconnectS2c {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginDisconnectS2c {
            reason: String::decode(r)?,
        })
    }
}

/// `LoginPluginRequest`, used by MODERN (Velocity) forwarding to carry the
/// forwarding handshake over channel `velocity:player_info`.
#[derive(Clone, Debug)]
pub struct LoginQueryRequestS2c<'a> {
    pub message_id: i32,
    pub channel: String,
    pub data: RawBytes<'a>,
}

impl Encode for LoginQueryRequestS2c<'_> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.message_id).encode(&mut w)?;
        self.channel.encode(&mut w)?;
        w.write_all(self.data.0)?;
        Ok(())
    }
}

// The proxy also receives this packet when it is itself the login client of
// a backend server relaying MODERN forwarding, hence both directions.
impl<'a> Decode<'a> for LoginQueryRequestS2c<'a> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(LoginQueryRequestS2c {
            message_id: VarInt::decode(r)?.0,
            channel: String::decode(r)?,
            data: RawBytes::decode(r)?,
        })
    }
}

/// `LoginPluginResponse`.
#[derive(Clone, Debug)]
pub struct LoginQueryResponseC2s<'a> {
    pub message_id: i32,
    pub data: Option<RawBytes<'a>>,
}

impl Encode for LoginQueryResponseC2s<'_> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        VarInt(self.message_id).encode(&mut w)?;
        self.data.is_some().encode(&mut w)?;
        if let Some(data) = &self.data {
            w.write_all(data.0)?;
        }
        Ok(())
    }
}

impl<'a> Decode<'a> for LoginQueryResponseC2s<'a> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let message_id = VarInt::decode(r)?.0;
        let present = bool::decode(r)?;
        let data = if present {
            Some(RawBytes::decode(r)?)
        } else {
            None
        };
        Ok(LoginQueryResponseC2s { message_id, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_success_round_trip() {
        let pkt = LoginSuccessS2c {
            uuid: Uuid::from_u128(1),
            username: "Notch".to_owned(),
            properties: vec![Property {
                name: "textures".to_owned(),
                value: "abc".to_owned(),
                signature: None,
            }],
        };
        let mut buf = vec![];
        pkt.encode(&mut buf).unwrap();
        let mut r = buf.as_slice();
        let decoded = LoginSuccessS2c::decode(&mut r).unwrap();
        assert_eq!(decoded.uuid, pkt.uuid);
        assert_eq!(decoded.username, pkt.username);
        assert_eq!(decoded.properties, pkt.properties);
        assert!(r.is_empty());
    }
}
