//! The closed error taxonomy that drives what the pipeline tells a player
//! when their connection is closed. Finer-grained context inside a single
//! connection-handling function still flows as `anyhow::Error`, converted
//! to one of these variants at the point a close decision is made.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no available servers")]
    NoAvailableServers,

    #[error("connection rejected by plugin: {0}")]
    PluginDenied(String),

    #[error("timed out waiting for the next packet")]
    Timeout,

    #[error("switch to a new backend was aborted")]
    SwitchAborted,
}

impl ProxyError {
    /// The plain-text, chat-formatted reason sent to the client in a
    /// disconnect packet, if the connection reached a state capable of
    /// receiving one.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::Protocol(_) => "Your client sent a packet the proxy could not understand.".to_owned(),
            ProxyError::Crypto(_) => "Unable to authenticate your session. Please try again.".to_owned(),
            ProxyError::Network(_) => "Connection error.".to_owned(),
            ProxyError::Configuration(_) => "The proxy is misconfigured. Please contact an administrator.".to_owned(),
            ProxyError::NoAvailableServers => "No available servers.".to_owned(),
            ProxyError::PluginDenied(reason) => reason.clone(),
            ProxyError::Timeout => "Timed out.".to_owned(),
            ProxyError::SwitchAborted => "Lost connection to the new server while switching.".to_owned(),
        }
    }
}
