//! The proxy's explicit, no-singleton startup context:
//! one value built once and handed to every connection task, rather than
//! state reached through a global. Grounded on
//! `valence_network::SharedNetworkState`'s RSA keypair generation and
//! `public_key_der` caching.

use std::sync::Arc;

use rand::rngs::OsRng;
use rsa::{PublicKeyParts, RsaPrivateKey};

use crate::authenticator::Authenticator;
use crate::config::ProxyConfig;
use crate::events::ProxyEvents;

pub struct ProxyContext {
    pub config: ProxyConfig,
    pub events: Arc<dyn ProxyEvents>,
    pub authenticator: Arc<dyn Authenticator>,
    pub rsa_key: RsaPrivateKey,
    pub public_key_der: Vec<u8>,
    pub forwarding_secret: Vec<u8>,
}

impl ProxyContext {
    pub fn new(
        config: ProxyConfig,
        events: Arc<dyn ProxyEvents>,
        authenticator: Arc<dyn Authenticator>,
    ) -> anyhow::Result<Self> {
        let forwarding_secret = config.load_forwarding_secret().unwrap_or_default();

        let rsa_key = RsaPrivateKey::new(&mut OsRng, 1024)?;
        let public_key_der = rsa_der::public_key_to_der(&rsa_key.n().to_bytes_be(), &rsa_key.e().to_bytes_be());

        Ok(Self {
            config,
            events,
            authenticator,
            rsa_key,
            public_key_der,
            forwarding_secret,
        })
    }
}
