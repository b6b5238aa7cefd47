//! Entry point: loads configuration, builds the proxy context, binds the
//! listener, and runs the accept loop. Grounded on
//! `valence_network::connect::do_accept_loop`'s bind/accept/spawn shape and
//! `packet_inspector`'s `tracing_subscriber::fmt()` initialization.

mod authenticator;
mod config;
mod context;
mod error;
mod events;
mod io;
mod pipeline;
mod router;
mod session;
mod switch;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use mc_proxy_protocol::packets::registry;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::authenticator::MojangAuthenticator;
use crate::config::{Cli, ProxyConfig};
use crate::context::ProxyContext;
use crate::events::NoopEvents;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ProxyConfig::load(&cli.config)?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err((a, b)) = registry::check_no_overlaps() {
        anyhow::bail!("packet registry configuration error: {a} and {b} have overlapping version ranges for the same id");
    }

    let ctx = Arc::new(ProxyContext::new(config, Arc::new(NoopEvents), Arc::new(MojangAuthenticator::new(false)))?);

    run_accept_loop(ctx).await
}

async fn run_accept_loop(ctx: Arc<ProxyContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config.listener.bind;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding listener to {bind_addr}"))?;

    ctx.events.listener_bound(bind_addr).await;
    info!(%bind_addr, "proxy listening");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "failed to accept incoming connection");
                continue;
            }
        };

        apply_listener_options(&stream, &ctx);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            session::handle_connection(ctx, stream, peer_addr).await;
        });
    }
}

/// Applies the socket options the standard library doesn't expose
/// (`IP_TOS`, `TCP_FASTOPEN`) via `socket2`, layered on top of the
/// `TCP_NODELAY` toggle set directly through `TcpStream`.
fn apply_listener_options(stream: &tokio::net::TcpStream, ctx: &ProxyContext) {
    let sock = SockRef::from(stream);

    if ctx.config.listener.ip_tos != 0 {
        if let Err(e) = sock.set_tos(ctx.config.listener.ip_tos) {
            tracing::debug!(error = %e, "failed to set IP_TOS");
        }
    }

    if ctx.config.listener.tcp_fastopen {
        if let Err(e) = sock.set_tcp_fastopen(5) {
            tracing::debug!(error = %e, "failed to set TCP_FASTOPEN");
        }
    }

    let _ = sock.set_tcp_keepalive(&TcpKeepalive::new());
}
