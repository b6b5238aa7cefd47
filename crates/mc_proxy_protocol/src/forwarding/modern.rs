//! MODERN (Velocity) forwarding: an HMAC-SHA256-signed payload sent as the
//! response to the backend's `velocity:player_info` login plugin request.
//!
//! Grounded on `valence_network::connect::login_velocity`, which implements
//! the *verifying* side of this exchange (a backend checking what a proxy
//! sent it); this module is the *signing* side, since this crate plays the
//! proxy role.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::profile::Property;
use crate::var_int::VarInt;
use crate::Encode;

type HmacSha256 = Hmac<Sha256>;

/// Supported Velocity forwarding payload versions. Version 1 carries no
/// signed chat key; versions 2/3 append one, which this proxy does not
/// possess (chat signing keys are issued by Mojang to the client, not
/// something a proxy can forward on the player's behalf without holding the
/// player's session), so this proxy only ever emits version 1.
pub const FORWARDING_VERSION: i32 = 1;

/// Builds and signs a MODERN forwarding payload.
pub fn sign_payload(
    secret: &[u8],
    client_ip: std::net::IpAddr,
    uuid: Uuid,
    username: &str,
    properties: &[Property],
) -> anyhow::Result<Vec<u8>> {
    let mut payload = Vec::new();
    VarInt(FORWARDING_VERSION).encode(&mut payload)?;
    client_ip.to_string().encode(&mut payload)?;
    uuid.encode(&mut payload)?;
    username.encode(&mut payload)?;
    properties.to_vec().encode(&mut payload)?;

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any length");
    mac.update(&payload);
    let signature = mac.finalize().into_bytes();

    let mut out = Vec::with_capacity(32 + payload.len());
    out.extend_from_slice(&signature);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Verifies a signed payload and, on success, returns the payload bytes
/// with the leading MAC stripped. Used by tests to exercise the exchange
/// end to end, mirroring what a real backend implementation does.
pub fn verify_payload<'a>(secret: &[u8], signed: &'a [u8]) -> anyhow::Result<&'a [u8]> {
    anyhow::ensure!(signed.len() >= 32, "forwarding payload missing MAC");
    let (signature, payload) = signed.split_at(32);

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any length");
    mac.update(payload);
    mac.verify_slice(signature)
        .map_err(|_| anyhow::anyhow!("forwarding payload MAC verification failed"))?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decode;

    #[test]
    fn round_trips_and_matches_configured_secret() {
        let secret = b"a shared proxy secret";
        let uuid = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
        let signed = sign_payload(secret, "203.0.113.5".parse().unwrap(), uuid, "Notch", &[]).unwrap();

        let payload = verify_payload(secret, &signed).unwrap();

        let mut r = payload;
        assert_eq!(VarInt::decode(&mut r).unwrap().0, 1);
        assert_eq!(String::decode(&mut r).unwrap(), "203.0.113.5");
        assert_eq!(Uuid::decode(&mut r).unwrap(), uuid);
        assert_eq!(String::decode(&mut r).unwrap(), "Notch");
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let uuid = Uuid::nil();
        let signed = sign_payload(b"secret-a", "127.0.0.1".parse().unwrap(), uuid, "X", &[]).unwrap();
        assert!(verify_payload(b"secret-b", &signed).is_err());
    }

    #[test]
    fn flipped_bit_fails_verification() {
        let uuid = Uuid::nil();
        let secret = b"secret";
        let mut signed = sign_payload(secret, "127.0.0.1".parse().unwrap(), uuid, "X", &[]).unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0x01;
        assert!(verify_payload(secret, &signed).is_err());
    }
}
