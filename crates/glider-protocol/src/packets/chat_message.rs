use crate::packet::Packet;
use crate::wrapper::PacketWrapper;
use glider_common::{Direction, ProtocolError, ProtocolVersion, Result};

pub const SIGNATURE_LENGTH: usize = 256;
/// Size of the window of previously seen messages a client acknowledges.
pub const LAST_SEEN_WINDOW: usize = 20;

/// Acknowledgement of the messages a client has seen since its last report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastSeenUpdate {
    pub offset: i32,
    /// One bit per slot of the last-seen window.
    pub acknowledged: Vec<u8>,
    /// Checksum over the acknowledged signatures, 1.21.5+
    pub checksum: u8,
}

/// Chat message sent by the client.
///
/// The signing fields came with 1.19.3; older revisions only carry the
/// text and leave the rest at defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessagePacket {
    pub message: String,
    pub timestamp: i64,
    pub salt: i64,
    pub signature: Option<Vec<u8>>,
    pub last_seen: LastSeenUpdate,
}

impl ChatMessagePacket {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: 0,
            salt: 0,
            signature: None,
            last_seen: LastSeenUpdate::default(),
        }
    }

    fn max_length(version: ProtocolVersion) -> usize {
        if version.is_older_than(ProtocolVersion::V_1_11) {
            100
        } else {
            256
        }
    }
}

fn check_signed_layout(version: ProtocolVersion) -> Result<()> {
    if version.is_newer_than_or_equals(ProtocolVersion::V_1_19)
        && version.is_older_than(ProtocolVersion::V_1_19_3)
    {
        return Err(ProtocolError::invalid_data(format!(
            "chat signing layout of {} is not supported",
            version
        )));
    }
    Ok(())
}

impl Packet for ChatMessagePacket {
    const NAME: &'static str = "chat_message";
    const DIRECTION: Direction = Direction::Serverbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let version = wrapper.version();
        check_signed_layout(version)?;
        let mut packet = Self::new(wrapper.read_string(Self::max_length(version))?);
        if version.is_older_than(ProtocolVersion::V_1_19_3) {
            return Ok(packet);
        }

        packet.timestamp = wrapper.read_i64()?;
        packet.salt = wrapper.read_i64()?;
        packet.signature = wrapper.read_optional(|w| w.read_bytes(SIGNATURE_LENGTH))?;
        packet.last_seen.offset = wrapper.read_varint()?;
        packet.last_seen.acknowledged = wrapper.read_fixed_bitset(LAST_SEEN_WINDOW)?;
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            packet.last_seen.checksum = wrapper.read_u8()?;
        }
        Ok(packet)
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        let version = wrapper.version();
        check_signed_layout(version)?;
        wrapper.write_string(&self.message);
        if version.is_older_than(ProtocolVersion::V_1_19_3) {
            return Ok(());
        }

        wrapper.write_i64(self.timestamp);
        wrapper.write_i64(self.salt);
        wrapper.write_optional(self.signature.as_ref(), |w, signature| {
            if signature.len() != SIGNATURE_LENGTH {
                return Err(ProtocolError::invalid_data(format!(
                    "signature is {} bytes, expected {}",
                    signature.len(),
                    SIGNATURE_LENGTH
                )));
            }
            w.write_bytes(signature);
            Ok(())
        })?;
        wrapper.write_varint(self.last_seen.offset);
        wrapper.write_fixed_bitset(&self.last_seen.acknowledged, LAST_SEEN_WINDOW);
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            wrapper.write_u8(self.last_seen.checksum);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn signed() -> ChatMessagePacket {
        let mut packet = ChatMessagePacket::new("hello");
        packet.timestamp = 1_700_000_000_000;
        packet.salt = -12;
        packet.signature = Some(vec![0xAB; SIGNATURE_LENGTH]);
        packet.last_seen = LastSeenUpdate {
            offset: 2,
            acknowledged: vec![0xFF, 0x0F, 0x01],
            checksum: 0x5A,
        };
        packet
    }

    fn encode(packet: &ChatMessagePacket, version: ProtocolVersion) -> Result<PacketWrapper> {
        let mut wrapper = PacketWrapper::writer(version, Direction::Serverbound);
        packet.write(&mut wrapper)?;
        Ok(PacketWrapper::reader(
            wrapper.into_buffer(),
            version,
            Direction::Serverbound,
        ))
    }

    #[test]
    fn test_legacy_text_only() {
        let mut reader = encode(&signed(), ProtocolVersion::V_1_12_2).unwrap();
        assert_eq!(reader.buffer().readable_bytes(), 6);
        assert_eq!(
            ChatMessagePacket::read(&mut reader).unwrap(),
            ChatMessagePacket::new("hello")
        );
    }

    #[test]
    fn test_signed_layout() {
        let packet = signed();

        let mut reader = encode(&packet, ProtocolVersion::V_1_20_5).unwrap();
        // text, two longs, present flag, signature, offset, 3-byte bitset
        assert_eq!(reader.buffer().readable_bytes(), 6 + 16 + 1 + 256 + 1 + 3);
        let decoded = ChatMessagePacket::read(&mut reader).unwrap();
        assert_eq!(decoded.last_seen.checksum, 0);
        assert_eq!(decoded.signature, packet.signature);

        let mut reader = encode(&packet, ProtocolVersion::V_1_21_5).unwrap();
        assert_eq!(ChatMessagePacket::read(&mut reader).unwrap(), packet);
    }

    #[test]
    fn test_unsigned_and_bad_signatures() {
        let mut packet = signed();
        packet.signature = None;
        let mut reader = encode(&packet, ProtocolVersion::V_1_19_3).unwrap();
        assert_eq!(ChatMessagePacket::read(&mut reader).unwrap().signature, None);

        packet.signature = Some(vec![1, 2, 3]);
        assert_matches!(
            encode(&packet, ProtocolVersion::V_1_19_3),
            Err(ProtocolError::InvalidData(_))
        );
    }

    #[test]
    fn test_preview_era_rejected() {
        assert_matches!(
            encode(&signed(), ProtocolVersion::V_1_19),
            Err(ProtocolError::InvalidData(_))
        );
    }

    #[test]
    fn test_length_limit_by_version() {
        let long = "a".repeat(150);
        let mut reader =
            encode(&ChatMessagePacket::new(long.clone()), ProtocolVersion::V_1_8).unwrap();
        assert_matches!(
            ChatMessagePacket::read(&mut reader),
            Err(ProtocolError::StringTooLong { .. })
        );

        let mut reader = encode(&ChatMessagePacket::new(long), ProtocolVersion::V_1_11).unwrap();
        assert!(ChatMessagePacket::read(&mut reader).is_ok());
    }
}
