//! Incoming packet framing: reassembles length-prefixed frames out of a
//! byte stream, undoes decryption and decompression, and hands back the raw
//! `(id, body)` pair for the registry to interpret or pass through.

use std::io::Read;

use anyhow::{bail, ensure};
use bytes::{Buf, BytesMut};
use flate2::bufread::ZlibDecoder;

use crate::cipher::CipherCodec;
use crate::error::VarIntDecodeError;
use crate::var_int::VarInt;
use crate::{CompressionThreshold, Decode, MAX_PACKET_SIZE};

/// A decoded packet frame: the leading id VarInt plus its raw, still-encoded
/// body. Most packets the proxy forwards are never decoded past this point.
#[derive(Debug, Clone)]
pub struct PacketFrame {
    pub id: i32,
    pub body: BytesMut,
}

impl PacketFrame {
    /// Decodes the body as `P`, checking that no bytes are left over.
    pub fn decode<'a, P: Decode<'a>>(&'a self) -> anyhow::Result<P> {
        let mut r = &self.body[..];
        let value = P::decode(&mut r)?;
        ensure!(
            r.is_empty(),
            "packet {} had {} leftover bytes after decoding",
            self.id,
            r.len()
        );
        Ok(value)
    }
}

#[derive(Default)]
pub struct PacketDecoder {
    buf: BytesMut,
    decompress_buf: Vec<u8>,
    threshold: CompressionThreshold,
    cipher: Option<CipherCodec>,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.threshold = threshold;
    }

    pub fn enable_encryption(&mut self, key: &[u8; 16]) {
        assert!(self.cipher.is_none(), "encryption is already enabled");
        let mut cipher = CipherCodec::new(key);
        cipher.decrypt(&mut self.buf);
        self.cipher = Some(cipher);
    }

    /// Attempts to pull one complete frame out of the buffer. Returns
    /// `Ok(None)` if more data is needed.
    pub fn try_next_packet(&mut self) -> anyhow::Result<Option<PacketFrame>> {
        let mut r = &self.buf[..];

        let packet_len = match VarInt::decode_partial(&mut r) {
            Ok(len) => len,
            Err(VarIntDecodeError::Incomplete) => return Ok(None),
            Err(VarIntDecodeError::TooLarge) => bail!("malformed packet length VarInt"),
        };

        ensure!(
            (0..=MAX_PACKET_SIZE).contains(&packet_len),
            "packet length of {packet_len} is out of bounds"
        );

        if r.len() < packet_len as usize {
            // Not enough data arrived yet.
            return Ok(None);
        }

        let packet_len_field_size = VarInt(packet_len).written_size();
        let frame_bytes = &r[..packet_len as usize];

        let data: BytesMut = if self.threshold.is_enabled() {
            let mut body_r = frame_bytes;
            let data_len = VarInt::decode(&mut body_r)?.0;

            if data_len == 0 {
                BytesMut::from(body_r)
            } else {
                ensure!(
                    data_len > self.threshold.0,
                    "decompressed packet length of {data_len} is below the compression \
                     threshold of {}",
                    self.threshold.0
                );
                ensure!(
                    data_len <= MAX_PACKET_SIZE,
                    "decompressed packet length of {data_len} exceeds the maximum"
                );

                self.decompress_buf.clear();
                self.decompress_buf.reserve(data_len as usize);

                let mut z = ZlibDecoder::new(body_r);
                z.read_to_end(&mut self.decompress_buf)?;

                ensure!(
                    self.decompress_buf.len() == data_len as usize,
                    "decompressed packet length mismatch: expected {data_len}, got {}",
                    self.decompress_buf.len()
                );

                BytesMut::from(&self.decompress_buf[..])
            }
        } else {
            BytesMut::from(frame_bytes)
        };

        self.buf.advance(packet_len_field_size + packet_len as usize);

        let mut id_r = &data[..];
        let id = VarInt::decode(&mut id_r)?.0;
        let body_start = data.len() - id_r.len();
        let body = data.slice(body_start..);

        Ok(Some(PacketFrame { id, body }))
    }

    pub fn queue_bytes(&mut self, mut bytes: BytesMut) {
        if let Some(cipher) = &mut self.cipher {
            cipher.decrypt(&mut bytes);
        }
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        let start = self.buf.len();
        self.buf.extend_from_slice(bytes);
        if let Some(cipher) = &mut self.cipher {
            let slice = &mut self.buf[start..];
            cipher.decrypt(slice);
        }
    }

    pub fn take_capacity(&mut self) -> BytesMut {
        self.buf.split_off(self.buf.len())
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::Encode;

    #[test]
    fn rejects_oversized_length() {
        let mut dec = PacketDecoder::new();
        let mut bad = BytesMut::new();
        VarInt(MAX_PACKET_SIZE + 1)
            .encode((&mut bad).writer())
            .unwrap();
        dec.queue_bytes(bad);
        assert!(dec.try_next_packet().is_err());
    }

    #[test]
    fn incomplete_frame_returns_none() {
        let mut dec = PacketDecoder::new();
        let mut buf = BytesMut::new();
        VarInt(10).encode((&mut buf).writer()).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);
        dec.queue_bytes(buf);
        assert!(dec.try_next_packet().unwrap().is_none());
    }
}
