//! Backend candidate selection: forced hosts, try-order fallback, dynamic
//! reordering, and failover dialing. Grounded on the forced-host and
//! try-order fallback idiom shown by
//! `other_examples/a0eea763_..._legacy_handler.rs` and
//! `other_examples/160a226c_..._proxy_handler.rs`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::{RouterConfig, ServerEntry};

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// A live ping/population sample a caller may supply to influence ordering.
/// The router never queries this itself; population figures and reachability
/// hints come from whatever already probed the servers (e.g. a status-ping
/// cache), keeping the router itself free of side effects beyond dialing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerStatus {
    pub reachable: bool,
    pub player_count: Option<u32>,
}

pub struct Router<'a> {
    config: &'a RouterConfig,
    servers: &'a HashMap<String, ServerEntry>,
}

#[derive(Debug, thiserror::Error)]
#[error("no candidate server in {candidates:?} could be reached: {last_error}")]
pub struct NoReachableServer {
    pub candidates: Vec<String>,
    pub last_error: String,
}

impl<'a> Router<'a> {
    pub fn new(config: &'a RouterConfig, servers: &'a HashMap<String, ServerEntry>) -> Self {
        Self { config, servers }
    }

    /// Resolves the ordered candidate list for a connection: a forced-host
    /// match if the virtual host the client dialed has one configured,
    /// otherwise the configured try order.
    pub fn candidates_for(&self, virtual_host: &str) -> Vec<String> {
        if let Some(forced) = self.config.forced_hosts.get(virtual_host) {
            return forced.clone();
        }
        self.config.try_order.clone()
    }

    /// Reorders `candidates` per the configured fallback policies. Dynamic
    /// fallback reordering (unreachable/zero-population candidates pushed to
    /// the end, relative order otherwise preserved) always runs first; the
    /// population-descending stable sort, if enabled, is applied to the
    /// result of that reordering, not the original list.
    pub fn reorder(&self, mut candidates: Vec<String>, statuses: &HashMap<String, ServerStatus>) -> Vec<String> {
        if self.config.enable_dynamic_fallbacks {
            let status_of = |name: &str| statuses.get(name).copied().unwrap_or_default();
            candidates.sort_by_key(|name| {
                let s = status_of(name);
                !s.reachable as u8
            });
        }

        if self.config.enable_most_populated_fallbacks {
            // Sort by population only within the reachable prefix; an
            // unreachable candidate must never be pulled back in front of a
            // reachable one no matter how high its population sample is.
            candidates.sort_by_key(|name| {
                let status = statuses.get(name).copied().unwrap_or_default();
                let count = status.player_count.unwrap_or(0);
                (!status.reachable as u8, std::cmp::Reverse(count))
            });
        }

        candidates
    }

    /// Attempts to dial each candidate in order, returning the first
    /// successful connection along with the name and address it used. Each
    /// failure's reason is kept so the final error can report the last one,
    /// so a caller can report why every candidate failed, not just the last.
    pub async fn dial(&self, candidates: &[String]) -> Result<(String, SocketAddr, TcpStream), NoReachableServer> {
        let mut last_error = "no candidates configured".to_owned();

        for name in candidates {
            let Some(entry) = self.servers.get(name) else {
                last_error = format!("{name:?} is not a configured server");
                continue;
            };

            match timeout(DIAL_TIMEOUT, TcpStream::connect(entry.address)).await {
                Ok(Ok(stream)) => {
                    debug!(server = %name, addr = %entry.address, "dialed backend");
                    return Ok((name.clone(), entry.address, stream));
                }
                Ok(Err(e)) => last_error = format!("{name:?} ({}): {e}", entry.address),
                Err(_) => last_error = format!("{name:?} ({}): dial timed out", entry.address),
            }
        }

        Err(NoReachableServer {
            candidates: candidates.to_vec(),
            last_error,
        })
    }

    /// Re-runs candidate selection for failover after an unexpected backend
    /// disconnect in Play, starting after the candidate that just failed.
    pub fn candidates_after_failure(&self, mut candidates: Vec<String>, failed: &str) -> Vec<String> {
        if let Some(pos) = candidates.iter().position(|c| c == failed) {
            candidates.drain(..=pos);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers() -> HashMap<String, ServerEntry> {
        let mut m = HashMap::new();
        m.insert(
            "lobby".to_owned(),
            ServerEntry { address: "127.0.0.1:25566".parse().unwrap(), forwarding_mode: None },
        );
        m.insert(
            "survival".to_owned(),
            ServerEntry { address: "127.0.0.1:25567".parse().unwrap(), forwarding_mode: None },
        );
        m.insert(
            "creative".to_owned(),
            ServerEntry { address: "127.0.0.1:25568".parse().unwrap(), forwarding_mode: None },
        );
        m
    }

    #[test]
    fn forced_host_overrides_try_order() {
        let mut forced_hosts = HashMap::new();
        forced_hosts.insert("play.example.com".to_owned(), vec!["survival".to_owned()]);
        let cfg = RouterConfig {
            try_order: vec!["lobby".to_owned()],
            forced_hosts,
            enable_dynamic_fallbacks: false,
            enable_most_populated_fallbacks: false,
            failover_on_unexpected_server_disconnect: false,
        };
        let servers = servers();
        let router = Router::new(&cfg, &servers);
        assert_eq!(router.candidates_for("play.example.com"), vec!["survival".to_owned()]);
        assert_eq!(router.candidates_for("other.example.com"), vec!["lobby".to_owned()]);
    }

    #[test]
    fn dynamic_fallback_runs_before_population_sort() {
        let cfg = RouterConfig {
            try_order: vec!["lobby".to_owned(), "survival".to_owned(), "creative".to_owned()],
            forced_hosts: HashMap::new(),
            enable_dynamic_fallbacks: true,
            enable_most_populated_fallbacks: true,
            failover_on_unexpected_server_disconnect: false,
        };
        let servers = servers();
        let router = Router::new(&cfg, &servers);

        let mut statuses = HashMap::new();
        // lobby is unreachable, despite the highest population sample.
        statuses.insert("lobby".to_owned(), ServerStatus { reachable: false, player_count: Some(100) });
        statuses.insert("survival".to_owned(), ServerStatus { reachable: true, player_count: Some(5) });
        statuses.insert("creative".to_owned(), ServerStatus { reachable: true, player_count: Some(20) });

        let candidates = router.candidates_for("anything");
        let reordered = router.reorder(candidates, &statuses);

        // Unreachable lobby is pushed to the end regardless of its population,
        // and among the reachable remainder creative (20) precedes survival (5).
        assert_eq!(reordered, vec!["creative".to_owned(), "survival".to_owned(), "lobby".to_owned()]);
    }

    #[test]
    fn failover_resumes_after_failed_candidate() {
        let cfg = RouterConfig {
            try_order: vec!["lobby".to_owned(), "survival".to_owned(), "creative".to_owned()],
            forced_hosts: HashMap::new(),
            enable_dynamic_fallbacks: false,
            enable_most_populated_fallbacks: false,
            failover_on_unexpected_server_disconnect: true,
        };
        let servers = servers();
        let router = Router::new(&cfg, &servers);
        let candidates = router.candidates_for("anything");
        let remaining = router.candidates_after_failure(candidates, "survival");
        assert_eq!(remaining, vec!["creative".to_owned()]);
    }
}
