//! The event bus the core consumes: a synchronous request/response
//! trait, default-implemented so the proxy runs standalone without a
//! plugin system wired in. Grounded on
//! `valence_network::NetworkCallbacks`'s `async_trait`-based hook points.

use std::net::IpAddr;

use async_trait::async_trait;
use mc_proxy_protocol::profile::GameProfile;

pub enum PreLoginDecision {
    Allow,
    Deny(String),
}

pub enum ServerPreConnectDecision {
    Allow,
    Deny(String),
    Reroute(String),
}

pub enum KickedFromServerDecision {
    Disconnect(String),
    Reroute(String),
    Fallback,
}

#[async_trait]
pub trait ProxyEvents: Send + Sync {
    async fn listener_bound(&self, addr: std::net::SocketAddr) {
        let _ = addr;
    }

    async fn listener_closed(&self, addr: std::net::SocketAddr) {
        let _ = addr;
    }

    async fn pre_login(&self, name: &str, ip: IpAddr) -> PreLoginDecision {
        let _ = (name, ip);
        PreLoginDecision::Allow
    }

    async fn game_profile_request(&self, profile: GameProfile) -> GameProfile {
        profile
    }

    async fn server_pre_connect(&self, player: &str, target: &str) -> ServerPreConnectDecision {
        let _ = (player, target);
        ServerPreConnectDecision::Allow
    }

    /// Given the router's resolved candidate order, choose which to dial
    /// first. The default keeps the router's own ordering.
    async fn choose_initial_server(&self, player: &str, candidates: Vec<String>) -> Vec<String> {
        let _ = player;
        candidates
    }

    async fn kicked_from_server(&self, player: &str, reason: &str) -> KickedFromServerDecision {
        let _ = (player, reason);
        KickedFromServerDecision::Fallback
    }
}

/// The default event bus: allows everything, never reroutes. Used when the
/// proxy has no plugin layer attached.
pub struct NoopEvents;

#[async_trait]
impl ProxyEvents for NoopEvents {}
