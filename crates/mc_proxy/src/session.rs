//! The per-connection state machine: handshake, then status or
//! login, then a transparent relay into Configuration/Play. Grounded on
//! `valence_network::connect`'s `handle_handshake`/`handle_status`/
//! `handle_login` free functions, extended with a backend-side login that
//! mirrors the client-side one and a hand-off into [`crate::pipeline`].

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use mc_proxy_protocol::forwarding::{legacy, modern, ForwardingMode};
use mc_proxy_protocol::packets::registry::CONFIGURATION_STATE_SINCE;
use mc_proxy_protocol::packets::{
    registry, DisconnectS2c, HandshakeC2s, LoginAcknowledgedC2s, LoginCompressionS2c,
    LoginDisconnectS2c, LoginHelloC2s, LoginHelloS2c, LoginKeyC2s, LoginQueryRequestS2c,
    LoginQueryResponseC2s, LoginSuccessS2c, NextState, PingC2s, PongS2c, StatusRequestC2s,
    StatusResponseS2c,
};
use mc_proxy_protocol::profile::{offline_uuid, GameProfile};
use mc_proxy_protocol::raw::RawBytes;
use mc_proxy_protocol::{CompressionThreshold, PacketSide, PacketState};
use rsa::PaddingScheme;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::context::ProxyContext;
use crate::io::ConnIo;
use crate::pipeline::{Relay, RelayConfig, RelaySide};
use crate::router::Router;
use crate::switch::{self, ReplayCache, SwitchError};

/// Compression kicks in once a single packet's uncompressed body is at
/// least this many bytes, matching the vanilla server's default.
const COMPRESSION_THRESHOLD: CompressionThreshold = CompressionThreshold(256);

const VELOCITY_CHANNEL: &str = "velocity:player_info";

/// Drives one accepted TCP connection from handshake through to either a
/// closed socket or a handed-off relay task. Each non-Play state enforces
/// the configured timeout so a stalled handshake or login can't pin a task
/// open forever.
pub async fn handle_connection(ctx: std::sync::Arc<ProxyContext>, stream: TcpStream, peer_addr: SocketAddr) {
    stream.set_nodelay(ctx.config.listener.tcp_nodelay).ok();

    let state_timeout = Duration::from_secs(ctx.config.login.non_play_state_timeout_secs);
    let result = timeout(state_timeout, run(&ctx, stream, peer_addr)).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(%peer_addr, error = %e, "connection closed with error"),
        Err(_) => warn!(%peer_addr, "connection timed out before completing its handshake/login"),
    }
}

async fn run(ctx: &ProxyContext, stream: TcpStream, peer_addr: SocketAddr) -> anyhow::Result<()> {
    let mut io = ConnIo::new(stream);
    let handshake: HandshakeC2s = io.recv_packet().await.context("reading handshake")?;

    match handshake.next_state {
        NextState::Status => handle_status(ctx, &mut io, &handshake, peer_addr).await,
        NextState::Login | NextState::Transfer => handle_login(ctx, io, handshake, peer_addr).await,
    }
}

/// Status is proxied transparently against whichever server the router
/// would pick for this virtual host, so a server-list ping reflects the
/// real backend rather than a value synthesized by the proxy.
async fn handle_status(
    ctx: &ProxyContext,
    io: &mut ConnIo,
    handshake: &HandshakeC2s,
    _peer_addr: SocketAddr,
) -> anyhow::Result<()> {
    let router = Router::new(&ctx.config.router, &ctx.config.servers);
    let candidates = router.candidates_for(&normalize_vhost(&handshake.server_address));

    let Ok((server_name, addr, backend_stream)) = router.dial(&candidates).await else {
        let _request: StatusRequestC2s = io.recv_packet().await?;
        io.send_packet(0x00, &StatusResponseS2c { json: offline_status_json() }).await?;
        let ping: PingC2s = io.recv_packet().await?;
        io.send_packet(0x01, &PongS2c { payload: ping.payload }).await?;
        return Ok(());
    };

    let mut backend_io = ConnIo::new(backend_stream);
    backend_io
        .send_packet(
            0x00,
            &HandshakeC2s {
                protocol_version: handshake.protocol_version,
                server_address: handshake.server_address.clone(),
                server_port: addr.port(),
                next_state: NextState::Status,
            },
        )
        .await
        .with_context(|| format!("handshaking with backend {server_name}"))?;

    let _request: StatusRequestC2s = io.recv_packet().await?;
    backend_io.send_packet(0x00, &StatusRequestC2s).await?;
    let response: StatusResponseS2c = backend_io.recv_packet().await?;
    io.send_packet(0x00, &response).await?;

    let ping: PingC2s = io.recv_packet().await?;
    backend_io.send_packet(0x01, &ping).await?;
    let pong: PongS2c = backend_io.recv_packet().await?;
    io.send_packet(0x01, &pong).await?;

    Ok(())
}

fn offline_status_json() -> String {
    r#"{"version":{"name":"proxy","protocol":0},"players":{"max":0,"online":0},"description":{"text":"No backend servers are reachable."}}"#.to_owned()
}

/// Strips any forwarding-payload suffix a legacy 1.6-era client might
/// already have appended and returns the plain hostname the router should
/// match against forced hosts.
fn normalize_vhost(server_address: &str) -> String {
    server_address.split('\0').next().unwrap_or(server_address).to_owned()
}

async fn handle_login(
    ctx: &ProxyContext,
    mut io: ConnIo,
    handshake: HandshakeC2s,
    peer_addr: SocketAddr,
) -> anyhow::Result<()> {
    let login_hello: LoginHelloC2s = io.recv_packet().await.context("reading LoginHello")?;
    let username = login_hello.username.clone();

    if let crate::events::PreLoginDecision::Deny(reason) = ctx.events.pre_login(&username, peer_addr.ip()).await {
        io.send_packet(0x00, &LoginDisconnectS2c { reason: json_text(&reason) }).await?;
        return Ok(());
    }

    let profile = if ctx.config.login.online_mode {
        match authenticate_online(ctx, &mut io, &username, peer_addr).await {
            Ok(profile) => profile,
            Err(e) => {
                io.send_packet(0x00, &LoginDisconnectS2c { reason: json_text(&e.to_string()) }).await?;
                return Err(e);
            }
        }
    } else {
        GameProfile { uuid: offline_uuid(&username), name: username.clone(), properties: vec![] }
    };

    let profile = ctx.events.game_profile_request(profile).await;

    io.send_packet(0x03, &LoginCompressionS2c { threshold: COMPRESSION_THRESHOLD.0 }).await?;
    io.set_compression(COMPRESSION_THRESHOLD);

    io.send_packet(
        0x02,
        &LoginSuccessS2c { uuid: profile.uuid, username: profile.name.clone(), properties: profile.properties.clone() },
    )
    .await?;

    if handshake.protocol_version >= CONFIGURATION_STATE_SINCE {
        let _ack: LoginAcknowledgedC2s = io.recv_packet().await.context("reading LoginAcknowledged")?;
    }

    let router = Router::new(&ctx.config.router, &ctx.config.servers);
    let vhost = normalize_vhost(&handshake.server_address);
    let candidates = router.reorder(router.candidates_for(&vhost), &Default::default());

    let (server_name, server_addr, backend_stream) = match router.dial(&candidates).await {
        Ok(dialed) => dialed,
        Err(e) => {
            let reason = crate::error::ProxyError::NoAvailableServers;
            io.send_packet(0x00, &LoginDisconnectS2c { reason: json_text(&reason.client_message()) }).await?;
            return Err(e).context("no configured backend accepted the connection");
        }
    };

    let forwarding_mode = ctx
        .config
        .servers
        .get(&server_name)
        .and_then(|s| s.forwarding_mode)
        .unwrap_or(ctx.config.forwarding.default_mode);

    let mut backend_io = match connect_backend(
        ctx,
        &handshake,
        &profile,
        peer_addr,
        server_addr,
        backend_stream,
        forwarding_mode,
    )
    .await
    {
        Ok(backend_io) => backend_io,
        Err(e) => {
            let reason = crate::error::ProxyError::Network(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
            io.send_packet(0x00, &LoginDisconnectS2c { reason: json_text(&reason.client_message()) }).await?;
            return Err(e);
        }
    };

    if handshake.protocol_version >= CONFIGURATION_STATE_SINCE {
        backend_io.send_packet(0x03, &LoginAcknowledgedC2s).await?;
    }

    info!(%username, server = %server_name, %peer_addr, "player connected");

    let (mut client_reader, mut client_writer) = io.into_split();
    let (mut backend_reader, mut backend_writer) = backend_io.into_split();

    let relay_cfg = RelayConfig {
        high_watermark_bytes: ctx.config.listener.high_watermark_bytes,
        low_watermark_bytes: ctx.config.listener.low_watermark_bytes,
    };
    let mut cache = ReplayCache::default();
    let mut current_dimension = "minecraft:overworld".to_owned();
    let mut current_server = server_name;
    let mut remaining_candidates = candidates;

    loop {
        let end = Relay::run(
            &mut client_reader,
            &mut client_writer,
            backend_reader,
            backend_writer,
            &relay_cfg,
            &mut cache,
            handshake.protocol_version,
            &mut current_dimension,
        )
        .await;

        let RelaySide::Backend = end.side else {
            tracing::debug!(%username, error = %end.error, "client disconnected");
            break;
        };

        if !ctx.config.router.failover_on_unexpected_server_disconnect {
            warn!(%username, server = %current_server, error = %end.error, "backend disconnected unexpectedly");
            break;
        }

        warn!(%username, server = %current_server, error = %end.error, "backend disconnected unexpectedly, attempting failover");
        remaining_candidates = router.candidates_after_failure(remaining_candidates, &current_server);

        let mut switched = None;
        loop {
            let Ok((next_name, next_addr, next_stream)) = router.dial(&remaining_candidates).await else {
                break;
            };
            let next_forwarding = ctx
                .config
                .servers
                .get(&next_name)
                .and_then(|s| s.forwarding_mode)
                .unwrap_or(ctx.config.forwarding.default_mode);

            match switch::perform_switch(
                ctx,
                &handshake,
                &profile,
                peer_addr,
                next_addr,
                next_stream,
                next_forwarding,
                &cache,
                &mut client_writer,
                &current_dimension,
            )
            .await
            {
                Ok((new_backend_reader, new_backend_writer)) => {
                    info!(%username, server = %next_name, "failed over to new backend");
                    switched = Some((next_name, new_backend_reader, new_backend_writer));
                    break;
                }
                Err(SwitchError::DialFailed(e)) => {
                    warn!(%username, server = %next_name, error = %e, "candidate backend rejected the switch login, trying next");
                    remaining_candidates = router.candidates_after_failure(remaining_candidates, &next_name);
                }
                Err(SwitchError::Aborted) => {
                    warn!(%username, "switch aborted after the new backend accepted the player, closing connection");
                    return Err(crate::error::ProxyError::SwitchAborted.into());
                }
            }
        }

        match switched {
            Some((next_name, new_backend_reader, new_backend_writer)) => {
                current_server = next_name;
                backend_reader = new_backend_reader;
                backend_writer = new_backend_writer;
            }
            None => {
                let reason = crate::error::ProxyError::NoAvailableServers;
                let disconnect_id =
                    registry::id_for("DisconnectS2c", PacketState::Play, PacketSide::Clientbound, handshake.protocol_version)
                        .unwrap_or(0x1a);
                client_writer
                    .send_packet(disconnect_id, &DisconnectS2c { reason: json_text(&reason.client_message()) })
                    .await
                    .ok();
                break;
            }
        }
    }

    info!(%username, "player disconnected");
    Ok(())
}

async fn authenticate_online(
    ctx: &ProxyContext,
    io: &mut ConnIo,
    username: &str,
    peer_addr: SocketAddr,
) -> anyhow::Result<GameProfile> {
    let my_verify_token: [u8; 16] = rand::random();

    io.send_packet(
        0x01,
        &LoginHelloS2c {
            server_id: String::new(),
            public_key: ctx.public_key_der.clone(),
            verify_token: my_verify_token.to_vec(),
            should_authenticate: true,
        },
    )
    .await?;

    let key: LoginKeyC2s = io.recv_packet().await.context("reading LoginKey")?;

    let shared_secret = ctx
        .rsa_key
        .decrypt(PaddingScheme::PKCS1v15Encrypt, &key.shared_secret)
        .context("failed to decrypt shared secret")?;
    let verify_token = ctx
        .rsa_key
        .decrypt(PaddingScheme::PKCS1v15Encrypt, &key.verify_token)
        .context("failed to decrypt verify token")?;

    ensure!(my_verify_token.as_slice() == verify_token, "verify tokens do not match");

    let crypt_key: [u8; 16] = shared_secret.as_slice().try_into().context("shared secret has the wrong length")?;
    io.enable_encryption(&crypt_key);

    let hash = crate::authenticator::server_hash("", &shared_secret, &ctx.public_key_der);

    ctx.authenticator
        .authenticate(username, &hash, Some(peer_addr.ip()))
        .await
        .map_err(anyhow::Error::from)
}

/// Performs the backend-facing handshake and login, rewriting the
/// handshake's `server_address` field for LEGACY/BUNGEEGUARD forwarding and
/// answering the backend's `velocity:player_info` login plugin request for
/// MODERN forwarding.
pub(crate) async fn connect_backend(
    ctx: &ProxyContext,
    client_handshake: &HandshakeC2s,
    profile: &GameProfile,
    peer_addr: SocketAddr,
    server_addr: SocketAddr,
    backend_stream: TcpStream,
    mode: ForwardingMode,
) -> anyhow::Result<ConnIo> {
    let server_address = match mode {
        ForwardingMode::None => client_handshake.server_address.clone(),
        ForwardingMode::Legacy => {
            legacy::encode_vhost(&client_handshake.server_address, peer_addr.ip(), profile.uuid, &profile.properties)?
        }
        ForwardingMode::BungeeGuard => {
            let token = std::str::from_utf8(&ctx.forwarding_secret).context("forwarding secret is not valid UTF-8")?;
            legacy::encode_vhost_with_token(&client_handshake.server_address, peer_addr.ip(), profile.uuid, &profile.properties, token)?
        }
        ForwardingMode::Modern => client_handshake.server_address.clone(),
    };

    let mut backend_io = ConnIo::new(backend_stream);
    backend_io
        .send_packet(
            0x00,
            &HandshakeC2s {
                protocol_version: client_handshake.protocol_version,
                server_address,
                server_port: server_addr.port(),
                next_state: NextState::Login,
            },
        )
        .await?;
    backend_io
        .send_packet(0x00, &LoginHelloC2s { username: profile.name.clone(), profile_id: Some(profile.uuid) })
        .await?;

    loop {
        let frame = backend_io.recv_frame().await?;

        match frame.id {
            0x00 => {
                let pkt: LoginDisconnectS2c = frame.decode()?;
                bail!("backend rejected login: {}", pkt.reason);
            }
            0x01 => bail!("backend requested encryption, which this proxy does not support on backend connections"),
            0x02 => {
                let _success: LoginSuccessS2c = frame.decode()?;
                return Ok(backend_io);
            }
            0x03 => {
                let pkt: LoginCompressionS2c = frame.decode()?;
                backend_io.set_compression(CompressionThreshold(pkt.threshold));
            }
            0x04 => {
                let request: LoginQueryRequestS2c<'_> = frame.decode()?;
                let response_data = if request.channel == VELOCITY_CHANNEL && mode == ForwardingMode::Modern {
                    Some(modern::sign_payload(&ctx.forwarding_secret, peer_addr.ip(), profile.uuid, &profile.name, &profile.properties)?)
                } else {
                    None
                };
                let data = response_data.as_deref().map(RawBytes);
                backend_io
                    .send_packet(0x02, &LoginQueryResponseC2s { message_id: request.message_id, data })
                    .await?;
            }
            other => bail!("unexpected packet id {other} during backend login"),
        }
    }
}

fn json_text(message: &str) -> String {
    serde_json::json!({ "text": message }).to_string()
}
