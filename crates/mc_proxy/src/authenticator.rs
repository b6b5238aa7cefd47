//! The session authenticator: verifies an online-mode
//! login against Mojang's session server. Grounded on
//! `valence_network::connect::login_online`'s `reqwest` call, URL
//! construction, and its `auth_digest` hashing helper (which carries the
//! same inline reference-value tests here).

use async_trait::async_trait;
use mc_proxy_protocol::profile::GameProfile;
use num_bigint::BigInt;
use sha1::{Digest, Sha1};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session server rejected the login (not logged in / joined)")]
    NotAuthenticated,
    #[error("session server returned an unexpected status: {0}")]
    UnexpectedStatus(u16),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("session server response did not match the login username")]
    UsernameMismatch,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        server_hash: &str,
        ip: Option<std::net::IpAddr>,
    ) -> Result<GameProfile, AuthError>;
}

/// The digest Mojang's session server expects as `serverId`: a signed,
/// big-endian hex encoding of `sha1(server_id || shared_secret || public_key_der)`,
/// which differs from a plain hex digest in that it can be negative.
pub fn auth_digest(bytes: &[u8]) -> String {
    BigInt::from_signed_bytes_be(bytes).to_str_radix(16)
}

pub struct MojangAuthenticator {
    client: reqwest::Client,
    prevent_proxy_connections: bool,
}

impl MojangAuthenticator {
    pub fn new(prevent_proxy_connections: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            prevent_proxy_connections,
        }
    }
}

#[async_trait]
impl Authenticator for MojangAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        server_hash: &str,
        ip: Option<std::net::IpAddr>,
    ) -> Result<GameProfile, AuthError> {
        let mut url = format!(
            "https://sessionserver.mojang.com/session/minecraft/hasJoined?username={username}&serverId={server_hash}"
        );

        if self.prevent_proxy_connections {
            if let Some(ip) = ip {
                url.push_str(&format!("&ip={ip}"));
            }
        }

        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            reqwest::StatusCode::OK => {}
            reqwest::StatusCode::NO_CONTENT => return Err(AuthError::NotAuthenticated),
            other => return Err(AuthError::UnexpectedStatus(other.as_u16())),
        }

        let profile: GameProfile = resp.json().await?;

        if !profile.name.eq_ignore_ascii_case(username) {
            return Err(AuthError::UsernameMismatch);
        }

        Ok(profile)
    }
}

/// Computes `sha1(server_id || shared_secret || public_key_der)` and
/// formats it the way the session server expects.
pub fn server_hash(server_id: &str, shared_secret: &[u8], public_key_der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(shared_secret);
    hasher.update(public_key_der);
    auth_digest(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values from the wiki.vg documentation of the session-server
    // hash format, which is exercised directly by these three usernames.
    #[test]
    fn auth_digest_reference_values() {
        assert_eq!(
            auth_digest(&Sha1::digest(b"Notch")),
            "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48"
        );
        assert_eq!(
            auth_digest(&Sha1::digest(b"jeb_")),
            "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1"
        );
        assert_eq!(
            auth_digest(&Sha1::digest(b"simon")),
            "88e16a1019277b15d58faf0541e11910eb756f6"
        );
    }
}
