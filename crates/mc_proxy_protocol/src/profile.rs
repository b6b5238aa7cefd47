//! Game profile and property types shared by the login flow, the
//! session-server authenticator, and every identity-forwarding protocol.

use std::io::Write;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Decode, Encode};

/// A single signed or unsigned profile property, e.g. the `textures`
/// property carrying a player's skin, or a `bungeeguard-token` property
/// injected by BUNGEEGUARD forwarding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Encode for Property {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.name.encode(&mut w)?;
        self.value.encode(&mut w)?;
        self.signature.encode(&mut w)?;
        Ok(())
    }
}

impl<'a> Decode<'a> for Property {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(Property {
            name: String::decode(r)?,
            value: String::decode(r)?,
            signature: Option::<String>::decode(r)?,
        })
    }
}

/// A resolved player identity: Mojang UUID, username, and the property list
/// (skin, cape, and any forwarding-injected properties) carried into the
/// backend's `GameProfile`/`LoginSuccess` packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    #[serde(rename = "id")]
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

/// Derives the offline-mode UUID the vanilla server and BungeeCord use for
/// unauthenticated players: an MD5 hash of `OfflinePlayer:<name>` with the
/// version nibble forced to 3 and the variant bits forced to the RFC 4122
/// "variant 1" form, matching a name-based (v3) UUID even though the input
/// isn't actually namespaced per RFC 4122.
pub fn offline_uuid(username: &str) -> Uuid {
    use md5::{Digest, Md5};

    let digest = Md5::digest(format!("OfflinePlayer:{username}").as_bytes());
    let mut bytes: [u8; 16] = digest.into();

    bytes[6] = (bytes[6] & 0x0f) | 0x30; // version 3
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // variant 2 (RFC 4122)

    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_uuid_matches_notchian_scheme() {
        // Reference value for "Notch" under the vanilla offline-UUID
        // algorithm (md5("OfflinePlayer:Notch") with version/variant bits
        // forced), as used by vanilla servers and BungeeCord in
        // offline-mode.
        let uuid = offline_uuid("Notch");
        assert_eq!(uuid.get_version_num(), 3);
        assert_eq!(uuid, Uuid::parse_str("b50ad385-829d-3141-a216-7e7d7539ba7f").unwrap());
    }

    #[test]
    fn offline_uuid_is_deterministic() {
        assert_eq!(offline_uuid("Alex"), offline_uuid("Alex"));
        assert_ne!(offline_uuid("Alex"), offline_uuid("Notch"));
    }
}
