//! The post-login packet relay: once a session leaves the Login
//! state, the proxy stops fully interpreting traffic and forwards framed
//! packets between the two sockets almost unchanged. Grounded on
//! `packet_inspector`'s passthrough relay loop (`State::rw_packet`).
//!
//! Relaying happens at the decoded-[`PacketFrame`] level rather than as a
//! raw byte splice, because the two legs almost always have independent
//! compression thresholds and independent (or absent) encryption: the
//! client's cipher has nothing to do with the backend's, so bytes must be
//! decoded off one leg's wire format and re-encoded onto the other's.
//!
//! The relay runs as a single task selecting between both directions rather
//! than two spawned per-direction pumps, so the client's
//! [`FrameReader`]/[`FrameWriter`] halves are only ever borrowed, never
//! moved into a task that could be aborted out from under them. That's what
//! lets a caller keep the client connection alive and reuse it across a
//! server switch after the backend leg ends: a pump that had `.abort()`ed
//! its sibling would simply drop the client's codec state along with it.
//! Each direction's read-ahead is still gated by the high/low watermark
//! pair from [`RelayConfig`], queued in-process rather than handed to a
//! separate writer task.

use std::collections::VecDeque;

use mc_proxy_protocol::decode::PacketFrame;
use mc_proxy_protocol::packets::registry;
use mc_proxy_protocol::packets::{JoinGameS2c, RespawnS2c};
use mc_proxy_protocol::{PacketSide, PacketState};
use tracing::debug;

use crate::io::{FrameReader, FrameWriter};
use crate::switch::ReplayCache;

pub struct RelayConfig {
    pub high_watermark_bytes: usize,
    pub low_watermark_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            high_watermark_bytes: 2 * 1024 * 1024,
            low_watermark_bytes: 1024 * 1024,
        }
    }
}

/// Which leg ended the relay phase, and why.
pub enum RelaySide {
    Client,
    Backend,
}

pub struct RelayEnd {
    pub side: RelaySide,
    pub error: anyhow::Error,
}

/// A direction's queued, not-yet-written frames and their total body size.
/// Reads into this direction pause once `bytes` crosses the high watermark
/// and resume once it drops back below the low one, the same pair the
/// listener is configured with.
///
/// The frame actively being written is tracked outside this struct, in its
/// own `Option<PacketFrame>` local in `Relay::run`, rather than as a field
/// here: a `tokio::select!` write branch borrows that frame for the life of
/// its future, and keeping it out of `Queue` means that borrow never
/// overlaps with the `&mut Queue` the sibling read branch takes to push a
/// newly read frame onto `frames`.
#[derive(Default)]
struct Queue {
    frames: VecDeque<PacketFrame>,
    bytes: usize,
    paused: bool,
}

impl Queue {
    fn push(&mut self, frame: PacketFrame, cfg: &RelayConfig) {
        self.bytes += frame.body.len();
        self.frames.push_back(frame);
        if self.bytes > cfg.high_watermark_bytes {
            self.paused = true;
        }
    }

    /// Dequeues the next frame to hand off to the in-flight write slot, if
    /// one's waiting and nothing is currently in flight.
    fn dequeue(&mut self, cfg: &RelayConfig) -> Option<PacketFrame> {
        let frame = self.frames.pop_front()?;
        self.bytes -= frame.body.len();
        if self.bytes <= cfg.low_watermark_bytes {
            self.paused = false;
        }
        Some(frame)
    }

    fn can_read(&self) -> bool {
        !self.paused
    }
}

pub struct Relay;

impl Relay {
    /// Runs one relay phase between the client and a single backend leg.
    /// Returns once either side's reader or writer fails, identifying which
    /// side ended so the caller can decide whether to close the session or
    /// attempt failover onto another backend. Client -> backend frames are
    /// passed to `cache.observe` as they're seen, so a later switch can
    /// replay the client's settings and plugin channel registrations to
    /// whichever backend it ends up on; backend -> client `JoinGame`/
    /// `Respawn` frames update `current_dimension` the same way, so a switch
    /// triggered later in the session still knows which dimension to send a
    /// throwaway reload against.
    pub async fn run(
        client_reader: &mut FrameReader,
        client_writer: &mut FrameWriter,
        mut backend_reader: FrameReader,
        mut backend_writer: FrameWriter,
        cfg: &RelayConfig,
        cache: &mut ReplayCache,
        protocol_version: i32,
        current_dimension: &mut String,
    ) -> RelayEnd {
        let mut to_backend = Queue::default();
        let mut to_client = Queue::default();
        let mut backend_in_flight: Option<PacketFrame> = None;
        let mut client_in_flight: Option<PacketFrame> = None;

        loop {
            if backend_in_flight.is_none() {
                backend_in_flight = to_backend.dequeue(cfg);
            }
            if client_in_flight.is_none() {
                client_in_flight = to_client.dequeue(cfg);
            }

            tokio::select! {
                result = client_reader.recv_frame(), if to_backend.can_read() => {
                    match result {
                        Ok(frame) => {
                            cache.observe(&frame, protocol_version);
                            to_backend.push(frame, cfg);
                        }
                        Err(error) => {
                            debug!(error = %error, "client leg ended");
                            return RelayEnd { side: RelaySide::Client, error };
                        }
                    }
                }
                result = backend_reader.recv_frame(), if to_client.can_read() => {
                    match result {
                        Ok(frame) => {
                            observe_dimension(&frame, protocol_version, current_dimension);
                            to_client.push(frame, cfg);
                        }
                        Err(error) => {
                            debug!(error = %error, "backend leg ended");
                            return RelayEnd { side: RelaySide::Backend, error };
                        }
                    }
                }
                result = backend_writer.send_frame(backend_in_flight.as_ref().unwrap()), if backend_in_flight.is_some() => {
                    match result {
                        Ok(()) => backend_in_flight = None,
                        Err(error) => {
                            debug!(error = %error, "backend leg ended while writing");
                            return RelayEnd { side: RelaySide::Backend, error };
                        }
                    }
                }
                result = client_writer.send_frame(client_in_flight.as_ref().unwrap()), if client_in_flight.is_some() => {
                    match result {
                        Ok(()) => client_in_flight = None,
                        Err(error) => {
                            debug!(error = %error, "client leg ended while writing");
                            return RelayEnd { side: RelaySide::Client, error };
                        }
                    }
                }
            }
        }
    }
}

/// Updates `current_dimension` from a backend `JoinGame`/`Respawn` frame, if
/// this one happens to be either. Decode failures are ignored: the frame is
/// still forwarded to the client unchanged either way.
fn observe_dimension(frame: &PacketFrame, protocol_version: i32, current_dimension: &mut String) {
    let Some(name) = registry::lookup(PacketState::Play, PacketSide::Clientbound, protocol_version, frame.id).map(|e| e.name) else {
        return;
    };
    match name {
        "JoinGameS2c" => {
            if let Ok(pkt) = frame.decode::<JoinGameS2c>() {
                *current_dimension = pkt.dimension_name;
            }
        }
        "RespawnS2c" => {
            if let Ok(pkt) = frame.decode::<RespawnS2c>() {
                *current_dimension = pkt.dimension_name;
            }
        }
        _ => {}
    }
}
