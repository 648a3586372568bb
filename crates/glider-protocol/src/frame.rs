//! Length-prefixed framing for byte streams.

use crate::packet::{encode_packet, Packet};
use crate::varint::{self, varint_len};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use glider_common::{CodecLimits, ProtocolError, ProtocolVersion, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Splits a stream into frames prefixed by their varint length.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_length: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(CodecLimits::default().max_frame_length)
    }
}

impl FrameCodec {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn from_limits(limits: &CodecLimits) -> Self {
        Self::new(limits.max_frame_length)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn check_length(&self, length: usize) -> Result<()> {
        if length > self.max_length {
            warn!(length, max = self.max_length, "rejecting oversized frame");
            return Err(ProtocolError::ArrayTooLong {
                length,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        let Some((length, prefix)) = varint::try_read_varint(&src[..])? else {
            return Ok(None);
        };
        let length = usize::try_from(length)
            .map_err(|_| ProtocolError::invalid_data(format!("negative frame length {}", length)))?;
        self.check_length(length)?;

        let total = prefix + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(prefix);
        trace!(length, "decoded frame");
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.check_length(frame.len())?;
        dst.reserve(varint_len(frame.len() as i32) + frame.len());
        varint::write_varint(dst, frame.len() as i32);
        dst.put_slice(&frame);
        trace!(length = frame.len(), "encoded frame");
        Ok(())
    }
}

/// Encodes `packet` for `version` and writes it, length prefix first.
pub async fn send_packet<P, W>(packet: &P, version: ProtocolVersion, writer: &mut W) -> Result<()>
where
    P: Packet,
    W: AsyncWrite + Unpin,
{
    let frame = encode_packet(packet, version)?.into_bytes();
    let mut framed = BytesMut::new();
    FrameCodec::default().encode(frame, &mut framed)?;
    writer.write_all(&framed).await?;
    Ok(())
}
