//! Identity-forwarding payload formats: how the proxy tells a backend
//! server who the connecting player really is, since the backend only ever
//! sees a TCP connection from the proxy itself.

pub mod legacy;
pub mod modern;

use serde::{Deserialize, Serialize};

/// The forwarding scheme used for a connection, selected from a per-server
/// override or the global default.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingMode {
    /// The backend sees the proxy's address; no identity is forwarded.
    None,
    /// BungeeCord-style `\0`-joined handshake vhost.
    Legacy,
    /// LEGACY plus a `bungeeguard-token` property.
    BungeeGuard,
    /// HMAC-SHA256-signed Velocity-style login plugin payload.
    Modern,
}
