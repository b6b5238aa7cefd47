//! The synchronous-phase connection I/O wrapper used during
//! handshake/status/login, before a connection splits into the
//! [`FrameReader`]/[`FrameWriter`] halves a relay pumps frames through.
//! Grounded on `valence_network::packet_io::PacketIo`.

use mc_proxy_protocol::decode::PacketFrame;
use mc_proxy_protocol::{CompressionThreshold, Decode, Encode, PacketDecoder, PacketEncoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const READ_BUF_SIZE: usize = 4096;

pub struct ConnIo {
    pub stream: TcpStream,
    pub enc: PacketEncoder,
    pub dec: PacketDecoder,
}

impl ConnIo {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            enc: PacketEncoder::new(),
            dec: PacketDecoder::new(),
        }
    }

    pub async fn send_packet<P: Encode>(&mut self, id: i32, pkt: &P) -> anyhow::Result<()> {
        self.enc.append_packet(id, pkt)?;
        let bytes = self.enc.take();
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    pub async fn recv_frame(&mut self) -> anyhow::Result<PacketFrame> {
        loop {
            if let Some(frame) = self.dec.try_next_packet()? {
                return Ok(frame);
            }

            self.dec.reserve(READ_BUF_SIZE);
            let mut buf = self.dec.take_capacity();

            if self.stream.read_buf(&mut buf).await? == 0 {
                anyhow::bail!("connection closed before a full packet arrived");
            }

            self.dec.queue_bytes(buf);
        }
    }

    pub async fn recv_packet<'a, P: Decode<'a>>(&'a mut self) -> anyhow::Result<P> {
        let frame = self.recv_frame().await?;
        frame.decode()
    }

    pub fn set_compression(&mut self, threshold: CompressionThreshold) {
        self.enc.set_compression(threshold);
        self.dec.set_compression(threshold);
    }

    pub fn enable_encryption(&mut self, key: &[u8; 16]) {
        self.enc.enable_encryption(key);
        self.dec.enable_encryption(key);
    }

    /// Splits into an independent reader and writer half, each keeping its
    /// own codec state. Used once a connection leaves the synchronous
    /// handshake/login phase and becomes one leg of a bidirectional relay:
    /// a pump only ever touches one reader or one writer, never both, so no
    /// lock is needed around either half's codec.
    pub fn into_split(self) -> (FrameReader, FrameWriter) {
        let (read, write) = self.stream.into_split();
        (
            FrameReader { read, dec: self.dec },
            FrameWriter { write, enc: self.enc },
        )
    }
}

pub struct FrameReader {
    read: OwnedReadHalf,
    dec: PacketDecoder,
}

impl FrameReader {
    pub async fn recv_frame(&mut self) -> anyhow::Result<PacketFrame> {
        loop {
            if let Some(frame) = self.dec.try_next_packet()? {
                return Ok(frame);
            }

            self.dec.reserve(READ_BUF_SIZE);
            let mut buf = self.dec.take_capacity();

            if self.read.read_buf(&mut buf).await? == 0 {
                anyhow::bail!("connection closed");
            }

            self.dec.queue_bytes(buf);
        }
    }
}

pub struct FrameWriter {
    write: OwnedWriteHalf,
    enc: PacketEncoder,
}

impl FrameWriter {
    pub async fn send_frame(&mut self, frame: &PacketFrame) -> anyhow::Result<()> {
        self.enc.append_packet_frame(frame)?;
        let bytes = self.enc.take();
        self.write.write_all(&bytes).await?;
        Ok(())
    }

    pub async fn send_packet<P: Encode>(&mut self, id: i32, pkt: &P) -> anyhow::Result<()> {
        self.enc.append_packet(id, pkt)?;
        let bytes = self.enc.take();
        self.write.write_all(&bytes).await?;
        Ok(())
    }
}
