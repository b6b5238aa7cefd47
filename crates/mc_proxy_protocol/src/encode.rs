//! Outgoing packet framing: length-prefixing, zlib compression above the
//! configured threshold, and AES-128/CFB8 encryption of the finished frame.

use std::io::Write;

use anyhow::ensure;
use bytes::{BufMut, BytesMut};

use crate::cipher::CipherCodec;
use crate::decode::PacketFrame;
use crate::var_int::VarInt;
use crate::{CompressionThreshold, Encode, MAX_PACKET_SIZE};

#[derive(Default)]
pub struct PacketEncoder {
    buf: BytesMut,
    compress_buf: Vec<u8>,
    threshold: CompressionThreshold,
    cipher: Option<CipherCodec>,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.threshold = threshold;
    }

    /// Enables encryption. Panics if encryption is already enabled, since
    /// the protocol only ever turns it on once per connection.
    pub fn enable_encryption(&mut self, key: &[u8; 16]) {
        assert!(self.cipher.is_none(), "encryption is already enabled");
        self.cipher = Some(CipherCodec::new(key));
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Encodes `pkt` with a leading id VarInt, then frames it (length
    /// prefix, optional compression).
    pub fn append_packet<P: Encode>(&mut self, id: i32, pkt: &P) -> anyhow::Result<()> {
        let start = self.buf.len();
        VarInt(id).encode((&mut self.buf).writer())?;
        pkt.encode((&mut self.buf).writer())?;
        self.enframe_from(start)
    }

    /// Re-frames an already-decoded frame (id + raw body), used to forward
    /// packets the proxy never interprets.
    pub fn append_packet_frame(&mut self, frame: &PacketFrame) -> anyhow::Result<()> {
        let start = self.buf.len();
        VarInt(frame.id).encode((&mut self.buf).writer())?;
        self.buf.extend_from_slice(&frame.body);
        self.enframe_from(start)
    }

    /// Frames the bytes from `from` to the end of the buffer: prefixes a
    /// packet length VarInt, and when compression is enabled, a data length
    /// VarInt followed by the zlib-compressed payload (or the literal
    /// payload with a zero data length, below the threshold).
    fn enframe_from(&mut self, from: usize) -> anyhow::Result<()> {
        let data_len = self.buf.len() - from;

        if self.threshold.is_enabled() {
            if data_len > self.threshold.0 as usize {
                use std::io::Read;

                use flate2::bufread::ZlibEncoder;
                use flate2::Compression;

                let mut z = ZlibEncoder::new(&self.buf[from..], Compression::new(4));
                self.compress_buf.clear();

                let data_len_size = VarInt(data_len as i32).written_size();
                let packet_len = data_len_size + z.read_to_end(&mut self.compress_buf)?;

                ensure!(
                    packet_len <= MAX_PACKET_SIZE as usize,
                    "packet exceeds maximum length"
                );

                drop(z);
                self.buf.truncate(from);

                let mut w = (&mut self.buf).writer();
                VarInt(packet_len as i32).encode(&mut w)?;
                VarInt(data_len as i32).encode(&mut w)?;
                self.buf.extend_from_slice(&self.compress_buf);
            } else {
                let data_len_size = 1;
                let packet_len = data_len_size + data_len;

                ensure!(
                    packet_len <= MAX_PACKET_SIZE as usize,
                    "packet exceeds maximum length"
                );

                let packet_len_size = VarInt(packet_len as i32).written_size();
                let prefix_len = packet_len_size + data_len_size;

                self.buf.put_bytes(0, prefix_len);
                self.buf.copy_within(from..from + data_len, from + prefix_len);

                let mut front = &mut self.buf[from..];
                VarInt(packet_len as i32).encode(&mut front)?;
                VarInt(0).encode(front)?;
            }

            return Ok(());
        }

        let packet_len = data_len;
        ensure!(
            packet_len <= MAX_PACKET_SIZE as usize,
            "packet exceeds maximum length"
        );

        let packet_len_size = VarInt(packet_len as i32).written_size();
        self.buf.put_bytes(0, packet_len_size);
        self.buf
            .copy_within(from..from + data_len, from + packet_len_size);

        let front = &mut self.buf[from..];
        VarInt(packet_len as i32).encode(front)?;

        Ok(())
    }

    /// Drains the encoder's buffer, applying the cipher (if enabled) to the
    /// bytes being taken.
    pub fn take(&mut self) -> BytesMut {
        if let Some(cipher) = &mut self.cipher {
            cipher.encrypt(&mut self.buf);
        }
        self.buf.split()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::PacketDecoder;

    #[derive(Debug, PartialEq, Eq)]
    struct TestPacket(String);

    impl Encode for TestPacket {
        fn encode(&self, w: impl Write) -> anyhow::Result<()> {
            self.0.encode(w)
        }
    }

    #[test]
    fn uncompressed_round_trip() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(5, &TestPacket("hello".to_owned())).unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(bytes);
        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.id, 5);
        let mut body = &frame.body[..];
        assert_eq!(String::decode(&mut body).unwrap(), "hello");
    }

    #[test]
    fn compressed_round_trip_above_and_below_threshold() {
        let mut enc = PacketEncoder::new();
        enc.set_compression(CompressionThreshold(8));

        enc.append_packet(1, &TestPacket("hi".to_owned())).unwrap(); // below threshold
        enc.append_packet(2, &TestPacket("a fairly long string payload".to_owned()))
            .unwrap(); // above threshold
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.set_compression(CompressionThreshold(8));
        dec.queue_bytes(bytes);

        let f1 = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(f1.id, 1);
        let f2 = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(f2.id, 2);
        let mut body = &f2.body[..];
        assert_eq!(
            String::decode(&mut body).unwrap(),
            "a fairly long string payload"
        );
    }

    #[test]
    fn encrypted_round_trip() {
        let key = [3u8; 16];

        let mut enc = PacketEncoder::new();
        enc.enable_encryption(&key);
        enc.append_packet(9, &TestPacket("secret".to_owned())).unwrap();
        let bytes = enc.take();

        let mut dec = PacketDecoder::new();
        dec.enable_encryption(&key);
        dec.queue_bytes(bytes);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.id, 9);
        let mut body = &frame.body[..];
        assert_eq!(String::decode(&mut body).unwrap(), "secret");
    }
}
