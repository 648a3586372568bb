use crate::packet::Packet;
use crate::wrapper::{PacketWrapper, ProtocolEnum};
use glider_common::{Direction, ProtocolError, ProtocolVersion, Result};

protocol_enum! {
    pub enum ChatVisibility {
        Full,
        System,
        Hidden,
    }
}

protocol_enum! {
    pub enum MainHand {
        Left,
        Right,
    }
}

protocol_enum! {
    pub enum ParticleStatus {
        All,
        Decreased,
        Minimal,
    }
}

const MAX_LOCALE_LENGTH: usize = 16;
/// Skin part bit that 1.7 clients sent as the show-cape flag.
const CAPE_BIT: u8 = 0x01;
/// Difficulty byte that 1.7 clients still sent; servers ignored it.
const LEGACY_DIFFICULTY: i8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettingsPacket {
    pub locale: String,
    pub view_distance: i8,
    pub chat_visibility: ChatVisibility,
    pub chat_colors: bool,
    /// Bitmask for skin parts
    pub displayed_skin_parts: u8,
    pub main_hand: MainHand,
    pub text_filtering: bool,
    pub allow_server_listings: bool,
    pub particle_status: ParticleStatus,
}

impl ClientSettingsPacket {
    pub fn new(locale: impl Into<String>, view_distance: i8) -> Self {
        Self {
            locale: locale.into(),
            view_distance,
            chat_visibility: ChatVisibility::Full,
            chat_colors: true,
            displayed_skin_parts: 0x7F,
            main_hand: MainHand::Right,
            text_filtering: false,
            allow_server_listings: true,
            particle_status: ParticleStatus::All,
        }
    }
}

impl Packet for ClientSettingsPacket {
    const NAME: &'static str = "client_settings";
    const DIRECTION: Direction = Direction::Serverbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let version = wrapper.version();
        let mut packet = Self::new(wrapper.read_string(MAX_LOCALE_LENGTH)?, wrapper.read_i8()?);

        packet.chat_visibility = if version.is_older_than(ProtocolVersion::V_1_9) {
            let ordinal = wrapper.read_i8()?;
            ChatVisibility::from_ordinal(ordinal as i32).ok_or_else(|| {
                ProtocolError::invalid_data(format!(
                    "unknown chat visibility {}",
                    ordinal
                ))
            })?
        } else {
            wrapper.read_enum()?
        };
        packet.chat_colors = wrapper.read_bool()?;

        if version.is_older_than(ProtocolVersion::V_1_8) {
            let _difficulty = wrapper.read_i8()?;
            packet.displayed_skin_parts = if wrapper.read_bool()? { CAPE_BIT } else { 0 };
        } else {
            packet.displayed_skin_parts = wrapper.read_u8()?;
        }

        if version.is_newer_than_or_equals(ProtocolVersion::V_1_9) {
            packet.main_hand = wrapper.read_enum()?;
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_17) {
            packet.text_filtering = wrapper.read_bool()?;
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_18) {
            packet.allow_server_listings = wrapper.read_bool()?;
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_2) {
            packet.particle_status = wrapper.read_enum()?;
        }
        Ok(packet)
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        let version = wrapper.version();
        wrapper.write_string(&self.locale);
        wrapper.write_i8(self.view_distance);

        if version.is_older_than(ProtocolVersion::V_1_9) {
            wrapper.write_i8(self.chat_visibility as i8);
        } else {
            wrapper.write_enum(self.chat_visibility);
        }
        wrapper.write_bool(self.chat_colors);

        if version.is_older_than(ProtocolVersion::V_1_8) {
            wrapper.write_i8(LEGACY_DIFFICULTY);
            wrapper.write_bool(self.displayed_skin_parts & CAPE_BIT != 0);
        } else {
            wrapper.write_u8(self.displayed_skin_parts);
        }

        if version.is_newer_than_or_equals(ProtocolVersion::V_1_9) {
            wrapper.write_enum(self.main_hand);
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_17) {
            wrapper.write_bool(self.text_filtering);
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_18) {
            wrapper.write_bool(self.allow_server_listings);
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_2) {
            wrapper.write_enum(self.particle_status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FrameBuffer;
    use assert_matches::assert_matches;

    fn round_trip(
        packet: &ClientSettingsPacket,
        version: ProtocolVersion,
    ) -> (usize, ClientSettingsPacket) {
        let mut wrapper = PacketWrapper::writer(version, Direction::Serverbound);
        packet.write(&mut wrapper).unwrap();
        let len = wrapper.buffer().writer_index();
        let mut reader =
            PacketWrapper::reader(wrapper.into_buffer(), version, Direction::Serverbound);
        let decoded = ClientSettingsPacket::read(&mut reader).unwrap();
        assert!(!reader.is_readable());
        (len, decoded)
    }

    #[test]
    fn test_fields_appear_by_version() {
        let mut packet = ClientSettingsPacket::new("en_us", 12);
        packet.main_hand = MainHand::Left;
        packet.text_filtering = true;
        packet.particle_status = ParticleStatus::Minimal;

        // locale (6) + view distance + chat mode + colors + skin parts
        let (len, decoded) = round_trip(&packet, ProtocolVersion::V_1_8);
        assert_eq!(len, 10);
        assert_eq!(decoded.main_hand, MainHand::Right);

        let (len, decoded) = round_trip(&packet, ProtocolVersion::V_1_9);
        assert_eq!(len, 11);
        assert_eq!(decoded.main_hand, MainHand::Left);
        assert!(!decoded.text_filtering);

        let (len, _) = round_trip(&packet, ProtocolVersion::V_1_17);
        assert_eq!(len, 12);
        let (len, _) = round_trip(&packet, ProtocolVersion::V_1_18);
        assert_eq!(len, 13);

        let (len, decoded) = round_trip(&packet, ProtocolVersion::V_1_21_2);
        assert_eq!(len, 14);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_legacy_cape_flag() {
        let mut packet = ClientSettingsPacket::new("de_de", 8);
        packet.displayed_skin_parts = 0x7E;
        let (_, decoded) = round_trip(&packet, ProtocolVersion::V_1_7_10);
        assert_eq!(decoded.displayed_skin_parts, 0);

        packet.displayed_skin_parts = 0x01;
        let (len, decoded) = round_trip(&packet, ProtocolVersion::V_1_7_10);
        assert_eq!(len, 11);
        assert_eq!(decoded.displayed_skin_parts, CAPE_BIT);
    }

    #[test]
    fn test_unknown_particle_status() {
        let mut buffer = FrameBuffer::new();
        buffer.write_string("en_us");
        buffer.write_i8(10);
        buffer.write_varint(0);
        buffer.write_bool(true);
        buffer.write_u8(0x7F);
        buffer.write_varint(1);
        buffer.write_bool(false);
        buffer.write_bool(true);
        buffer.write_varint(3);

        let mut wrapper =
            PacketWrapper::reader(buffer, ProtocolVersion::V_1_21_4, Direction::Serverbound);
        assert_matches!(
            ClientSettingsPacket::read(&mut wrapper),
            Err(ProtocolError::InvalidData(_))
        );
    }
}
