use bytes::{Bytes, BytesMut};
use glider::protocol::{encode_packet, FrameCodec, Packet, PacketFrame};
use glider::{Direction, ProtocolVersion, Result};
use tokio_util::codec::Encoder;

/// Length-prefixed stream holding `frames` back to back.
pub fn framed_stream(frames: &[Bytes]) -> Vec<u8> {
    let mut codec = FrameCodec::default();
    let mut stream = BytesMut::new();
    for frame in frames {
        codec.encode(frame.clone(), &mut stream).unwrap();
    }
    stream.to_vec()
}

pub fn encode<P: Packet>(packet: &P, version: ProtocolVersion) -> Bytes {
    encode_packet(packet, version).unwrap().into_bytes()
}

/// Encodes `packet` at `version` and parses it back as a received frame.
pub fn receive<P: Packet>(packet: &P, version: ProtocolVersion) -> Result<PacketFrame> {
    PacketFrame::parse(encode(packet, version).to_vec(), version, P::DIRECTION)
}

pub fn serverbound(bytes: &[u8], version: ProtocolVersion) -> PacketFrame {
    PacketFrame::parse(bytes.to_vec(), version, Direction::Serverbound).unwrap()
}
