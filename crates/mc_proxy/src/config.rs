//! Proxy configuration: a TOML file describing the backend server table,
//! the router's forced hosts and try order, and the identity-forwarding
//! defaults, loaded once at startup. Grounded on `packet_inspector`'s
//! `serde`-based config plus `clap::Parser` CLI entry point.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mc_proxy_protocol::forwarding::ForwardingMode;
use serde::{Deserialize, Serialize};

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "A transparent Minecraft Java Edition proxy")]
pub struct Cli {
    /// Path to the proxy's TOML configuration file.
    #[clap(short, long, default_value = "proxy.toml")]
    pub config: PathBuf,

    /// Overrides the `log` level in the config file (e.g. `debug`, `trace`).
    #[clap(long)]
    pub log_level: Option<String>,
}

/// One configured backend server. Immutable after config load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerEntry {
    pub address: SocketAddr,
    /// Overrides `forwarding.default_mode` for connections to this server.
    pub forwarding_mode: Option<ForwardingMode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ForwardingConfig {
    #[serde(default = "default_forwarding_mode")]
    pub default_mode: ForwardingMode,
    /// Path to a file containing the forwarding secret. Mutually exclusive
    /// in practice with the `VELOCITY_FORWARDING_SECRET` environment
    /// variable, which takes precedence when set.
    pub secret_file: Option<PathBuf>,
}

fn default_forwarding_mode() -> ForwardingMode {
    ForwardingMode::None
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    pub try_order: Vec<String>,
    #[serde(default)]
    pub forced_hosts: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub enable_dynamic_fallbacks: bool,
    #[serde(default)]
    pub enable_most_populated_fallbacks: bool,
    #[serde(default)]
    pub failover_on_unexpected_server_disconnect: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind: SocketAddr,
    #[serde(default = "default_true")]
    pub tcp_nodelay: bool,
    #[serde(default = "default_ip_tos")]
    pub ip_tos: u32,
    #[serde(default)]
    pub tcp_fastopen: bool,
    /// Relay read-ahead pauses once a direction's queued, unwritten bytes
    /// cross this and resumes once they drop back to `low_watermark_bytes`.
    #[serde(default = "default_high_watermark")]
    pub high_watermark_bytes: usize,
    #[serde(default = "default_low_watermark")]
    pub low_watermark_bytes: usize,
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:25565".parse().unwrap()
}
fn default_true() -> bool {
    true
}
fn default_ip_tos() -> u32 {
    0x18
}
fn default_high_watermark() -> usize {
    2 * 1024 * 1024
}
fn default_low_watermark() -> usize {
    1024 * 1024
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginConfig {
    #[serde(default)]
    pub online_mode: bool,
    #[serde(default = "default_login_timeout")]
    pub non_play_state_timeout_secs: u64,
}

fn default_login_timeout() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub listener: ListenerConfig,
    pub login: LoginConfig,
    pub forwarding: ForwardingConfig,
    pub router: RouterConfig,
    pub servers: HashMap<String, ServerEntry>,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl ProxyConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: ProxyConfig = toml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration-category validation run once at startup: every name in
    /// `try_order` and every `forced_hosts` target must resolve to a
    /// configured server, and a forwarding secret must be available unless
    /// the default mode is `None` and no server overrides it.
    fn validate(&self) -> anyhow::Result<()> {
        for name in &self.router.try_order {
            anyhow::ensure!(
                self.servers.contains_key(name),
                "try_order references unknown server {name:?}"
            );
        }
        for (host, candidates) in &self.router.forced_hosts {
            for name in candidates {
                anyhow::ensure!(
                    self.servers.contains_key(name),
                    "forced_hosts[{host:?}] references unknown server {name:?}"
                );
            }
        }

        let any_forwarding = self.forwarding.default_mode != ForwardingMode::None
            || self
                .servers
                .values()
                .any(|s| matches!(s.forwarding_mode, Some(m) if m != ForwardingMode::None));

        if any_forwarding {
            anyhow::ensure!(
                self.forwarding.secret_file.is_some()
                    || std::env::var("VELOCITY_FORWARDING_SECRET").is_ok(),
                "a forwarding secret must be configured when any server uses a forwarding mode \
                 other than none"
            );
        }

        Ok(())
    }

    pub fn load_forwarding_secret(&self) -> anyhow::Result<Vec<u8>> {
        if let Ok(secret) = std::env::var("VELOCITY_FORWARDING_SECRET") {
            return Ok(secret.into_bytes());
        }
        let path = self
            .forwarding
            .secret_file
            .as_ref()
            .context("no forwarding secret configured")?;
        let secret = std::fs::read_to_string(path)
            .with_context(|| format!("reading forwarding secret file {}", path.display()))?;
        Ok(secret.trim_end().as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_try_order_referencing_unknown_server() {
        let config = ProxyConfig {
            log_level: "info".to_owned(),
            listener: ListenerConfig {
                bind: default_bind_addr(),
                tcp_nodelay: true,
                ip_tos: 0x18,
                tcp_fastopen: false,
                high_watermark_bytes: default_high_watermark(),
                low_watermark_bytes: default_low_watermark(),
            },
            login: LoginConfig {
                online_mode: false,
                non_play_state_timeout_secs: 30,
            },
            forwarding: ForwardingConfig {
                default_mode: ForwardingMode::None,
                secret_file: None,
            },
            router: RouterConfig {
                try_order: vec!["lobby".to_owned()],
                forced_hosts: HashMap::new(),
                enable_dynamic_fallbacks: false,
                enable_most_populated_fallbacks: false,
                failover_on_unexpected_server_disconnect: false,
            },
            servers: HashMap::new(),
        };
        assert!(config.validate().is_err());
    }
}
