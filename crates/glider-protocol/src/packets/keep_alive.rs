use crate::packet::Packet;
use crate::wrapper::PacketWrapper;
use glider_common::{Direction, ProtocolVersion, Result};

/// Keep-alive ping sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePacket {
    pub keep_alive_id: i64,
}

/// The client's echo of a [`KeepAlivePacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveResponsePacket {
    pub keep_alive_id: i64,
}

impl KeepAlivePacket {
    pub fn new(keep_alive_id: i64) -> Self {
        Self { keep_alive_id }
    }
}

impl KeepAliveResponsePacket {
    pub fn new(keep_alive_id: i64) -> Self {
        Self { keep_alive_id }
    }
}

// int before 1.8, varint until 1.12.2, long after
fn read_id(wrapper: &mut PacketWrapper) -> Result<i64> {
    let version = wrapper.version();
    if version.is_older_than(ProtocolVersion::V_1_8) {
        Ok(wrapper.read_i32()? as i64)
    } else if version.is_older_than(ProtocolVersion::V_1_12_2) {
        Ok(wrapper.read_varint()? as i64)
    } else {
        wrapper.read_i64()
    }
}

fn write_id(wrapper: &mut PacketWrapper, id: i64) {
    let version = wrapper.version();
    if version.is_older_than(ProtocolVersion::V_1_8) {
        wrapper.write_i32(id as i32);
    } else if version.is_older_than(ProtocolVersion::V_1_12_2) {
        wrapper.write_varint(id as i32);
    } else {
        wrapper.write_i64(id);
    }
}

impl Packet for KeepAlivePacket {
    const NAME: &'static str = "keep_alive";
    const DIRECTION: Direction = Direction::Clientbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        Ok(Self::new(read_id(wrapper)?))
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        write_id(wrapper, self.keep_alive_id);
        Ok(())
    }
}

impl Packet for KeepAliveResponsePacket {
    const NAME: &'static str = "keep_alive";
    const DIRECTION: Direction = Direction::Serverbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        Ok(Self::new(read_id(wrapper)?))
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        write_id(wrapper, self.keep_alive_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{decode_packet, encode_packet, PacketFrame};

    #[test]
    fn test_id_width_by_version() {
        let cases = [
            (ProtocolVersion::V_1_7_10, 1 + 4),
            (ProtocolVersion::V_1_8, 1 + 2),
            (ProtocolVersion::V_1_12, 1 + 2),
            (ProtocolVersion::V_1_12_2, 1 + 8),
        ];
        for (version, len) in cases {
            let frame = encode_packet(&KeepAliveResponsePacket::new(300), version).unwrap();
            assert_eq!(frame.writer_index(), len, "{}", version);

            let frame =
                PacketFrame::parse(frame.into_inner(), version, Direction::Serverbound).unwrap();
            let decoded: KeepAliveResponsePacket = decode_packet(frame).unwrap();
            assert_eq!(decoded.keep_alive_id, 300);
        }
    }
}
