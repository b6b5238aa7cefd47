use thiserror::Error;

/// Errors from decoding a VarInt or VarLong.
#[derive(Copy, Clone, Debug, Error)]
pub enum VarIntDecodeError {
    #[error("incomplete VarInt")]
    Incomplete,
    #[error("VarInt is too large")]
    TooLarge,
}

/// Errors raised by the framing/cipher/compression layer, distinct from the
/// generic `anyhow::Error` used for packet-body decode failures.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("incomplete frame")]
    Incomplete,
    #[error("frame length {0} exceeds the maximum packet size")]
    TooLarge(i32),
    #[error("received packet length of {0}, which is out of bounds")]
    InvalidLength(i32),
    #[error(
        "decompressed packet length of {len} is shorter than the compression threshold {threshold}"
    )]
    BelowThreshold { len: i32, threshold: i32 },
    #[error("decompressed packet length of {0} exceeds the maximum packet size")]
    DecompressedTooLarge(i32),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
