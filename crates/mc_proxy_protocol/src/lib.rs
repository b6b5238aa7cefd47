//! Wire-level primitives for the Minecraft Java Edition protocol: VarInt
//! encoding, packet framing, cipher and compression filters, the packet
//! registry used by the proxy, and the identity-forwarding payload formats.

use std::io::Write;

pub mod bounded;
pub mod cipher;
pub mod decode;
pub mod encode;
pub mod error;
pub mod forwarding;
pub mod impls;
pub mod packets;
pub mod profile;
pub mod raw;
pub mod var_int;

pub use bounded::Bounded;
pub use decode::{PacketDecoder, PacketFrame};
pub use encode::PacketEncoder;
pub use raw::RawBytes;
pub use var_int::{VarInt, VarLong};

/// The largest packet the proxy will accept on either side of a connection,
/// in bytes, measured after decompression.
pub const MAX_PACKET_SIZE: i32 = 2 * 1024 * 1024;

/// A type that can be written to the Minecraft wire format.
pub trait Encode {
    fn encode(&self, w: impl Write) -> anyhow::Result<()>;
}

/// A type that can be parsed from the Minecraft wire format. Decoding
/// borrows from the input slice so string- and byte-array-bearing packets
/// can avoid copying their payload.
pub trait Decode<'a>: Sized {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self>;
}

/// Protocol state a connection is in, matching the vanilla handshake's
/// `next_state` values plus the proxy-relevant states layered on top in
/// later protocol versions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketState {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
}

/// Direction a packet travels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PacketSide {
    Serverbound,
    Clientbound,
}

/// A packet known to the registry: has a stable id within its
/// `(state, side)` pair and can encode/decode itself.
pub trait Packet: std::fmt::Debug {
    const ID: i32;
    const STATE: PacketState;
    const SIDE: PacketSide;
}

/// The threshold, in bytes, above which outgoing packets are zlib
/// compressed. A negative value means compression is disabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct CompressionThreshold(pub i32);

impl CompressionThreshold {
    pub const DISABLED: CompressionThreshold = CompressionThreshold(-1);

    pub fn is_enabled(self) -> bool {
        self.0 >= 0
    }
}
