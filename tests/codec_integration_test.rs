mod common;

use assert_matches::assert_matches;
use common::*;
use futures::StreamExt;
use glider::protocol::chunk::ChunkSection;
use glider::protocol::packets::chat_message::ChatMessagePacket;
use glider::protocol::packets::chunk_data::{ChunkDataPacket, HeightmapType};
use glider::protocol::packets::client_settings::{ClientSettingsPacket, MainHand};
use glider::protocol::packets::entity_action::{Action, EntityActionPacket};
use glider::protocol::packets::keep_alive::KeepAlivePacket;
use glider::protocol::packets::spawn_experience_orb::SpawnExperienceOrbPacket;
use glider::protocol::{
    catch_cancel, decode_packet, encode_packet, packet_types, send_packet, FrameBuffer,
    FrameCodec, Outcome, PacketFrame,
};
use glider::{CodecLimits, Direction, ProtocolError, ProtocolVersion, Result};
use tokio_util::codec::FramedRead;

#[tokio::test]
async fn test_send_keep_alive() {
    // length 9, id 0x26, then the id as a big-endian long
    let mut writer = tokio_test::io::Builder::new()
        .write(&[0x09, 0x26, 0, 0, 0, 0, 0, 0, 0x01, 0x2C])
        .build();

    send_packet(&KeepAlivePacket::new(300), ProtocolVersion::V_1_20_5, &mut writer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_read_frames_from_stream() {
    let version = ProtocolVersion::V_1_21;
    let orb = SpawnExperienceOrbPacket::new(12, 0.5, 70.0, -8.25, 3);
    let stream = framed_stream(&[
        encode(&KeepAlivePacket::new(-1), version),
        encode(&orb, version),
    ]);

    let reader = tokio_test::io::Builder::new().read(&stream).build();
    let mut frames = FramedRead::new(reader, FrameCodec::default());
    let clientbound = packet_types(Direction::Clientbound);

    let first = frames.next().await.unwrap().unwrap();
    let frame = PacketFrame::parse(first.to_vec(), version, Direction::Clientbound).unwrap();
    assert!(frame.is::<KeepAlivePacket>(clientbound));
    assert!(!frame.is::<SpawnExperienceOrbPacket>(clientbound));
    assert_eq!(decode_packet::<KeepAlivePacket>(frame).unwrap().keep_alive_id, -1);

    let second = frames.next().await.unwrap().unwrap();
    let frame = PacketFrame::parse(second.to_vec(), version, Direction::Clientbound).unwrap();
    assert_eq!(frame.type_id, 0x02);
    assert_eq!(decode_packet::<SpawnExperienceOrbPacket>(frame).unwrap(), orb);

    assert!(frames.next().await.is_none());
}

/// Decodes a serverbound entity action and re-encodes it for `target`,
/// dropping actions the target version no longer has.
fn translate_entity_action(frame: PacketFrame, target: ProtocolVersion) -> Result<FrameBuffer> {
    let packet: EntityActionPacket = decode_packet(frame)?;
    if packet.action.network_id(target).is_err() {
        return glider::protocol::cancel();
    }
    encode_packet(&packet, target)
}

#[test]
fn test_translate_entity_action_to_1_21_6() {
    // id 0x27, entity 42, start_sprinting, no jump boost
    let frame = serverbound(&[0x27, 42, 3, 0], ProtocolVersion::V_1_21_5);
    let translated = translate_entity_action(frame, ProtocolVersion::V_1_21_6).unwrap();
    assert_eq!(translated.as_slice(), &[0x29, 42, 1, 0][..]);

    // start_sneaking is gone in 1.21.6
    let frame = serverbound(&[0x27, 42, 0, 0], ProtocolVersion::V_1_21_5);
    let outcome = catch_cancel(translate_entity_action(frame, ProtocolVersion::V_1_21_6)).unwrap();
    assert_eq!(outcome, Outcome::Dropped);

    // other failures still surface
    let frame = serverbound(&[0x27, 42, 9, 0], ProtocolVersion::V_1_21_5);
    assert_matches!(
        catch_cancel(translate_entity_action(frame, ProtocolVersion::V_1_21_6)),
        Err(ProtocolError::UnknownMapping { id: 9, .. })
    );
}

#[test]
fn test_client_settings_across_versions() {
    let mut settings = ClientSettingsPacket::new("en_us", 12);
    settings.main_hand = MainHand::Left;
    settings.text_filtering = true;

    let frame = receive(&settings, ProtocolVersion::V_1_21_6).unwrap();
    assert_eq!(frame.type_id, 0x0D);
    assert_eq!(decode_packet::<ClientSettingsPacket>(frame).unwrap(), settings);

    // 1.8 has no main hand or filtering, they come back as defaults
    let frame = receive(&settings, ProtocolVersion::V_1_8).unwrap();
    let legacy = decode_packet::<ClientSettingsPacket>(frame).unwrap();
    assert_eq!(legacy.locale, "en_us");
    assert_eq!(legacy.main_hand, MainHand::Right);
    assert!(!legacy.text_filtering);
}

fn sample_sections() -> Vec<ChunkSection> {
    let mut bottom = ChunkSection::new();
    for x in 0..16 {
        for z in 0..16 {
            bottom.set_block(x, 0, z, 33);
        }
    }
    bottom.set_block(4, 1, 4, 2098);
    bottom.set_biome(0, 0, 0, 7);

    let mut sections = vec![bottom, ChunkSection::new(), ChunkSection::new()];
    sections[2].set_block(15, 15, 15, 9);
    sections
}

#[test]
fn test_chunk_column_from_1_21_4_to_1_21_5() {
    let mut packet = ChunkDataPacket::new(-3, 8);
    packet
        .heightmaps
        .push((HeightmapType::MotionBlocking, vec![0x0101_0101; 37]));
    packet
        .set_sections(&sample_sections(), ProtocolVersion::V_1_21_4)
        .unwrap();

    let frame = receive(&packet, ProtocolVersion::V_1_21_4).unwrap();
    assert_eq!(frame.type_id, 0x28);
    let received = decode_packet::<ChunkDataPacket>(frame).unwrap();
    let sections = received.sections(3, ProtocolVersion::V_1_21_4).unwrap();

    let mut translated = received.clone();
    translated
        .set_sections(&sections, ProtocolVersion::V_1_21_5)
        .unwrap();
    let frame = receive(&translated, ProtocolVersion::V_1_21_5).unwrap();
    assert_eq!(frame.type_id, 0x27);
    let decoded = decode_packet::<ChunkDataPacket>(frame).unwrap();

    assert_eq!(decoded.chunk_x, -3);
    assert_eq!(
        decoded.heightmap(HeightmapType::MotionBlocking),
        Some(&[0x0101_0101; 37][..])
    );
    let sections = decoded.sections(3, ProtocolVersion::V_1_21_5).unwrap();
    assert_eq!(sections[0].block_count(), 257);
    assert_eq!(sections[0].get_block(4, 1, 4), 2098);
    assert_eq!(sections[0].get_block(9, 0, 2), 33);
    assert_eq!(sections[0].get_biome(0, 0, 0), 7);
    assert!(sections[1].is_empty());
    assert_eq!(sections[2].get_block(15, 15, 15), 9);
}

#[test]
fn test_limits_apply_to_received_frames() {
    let limits = CodecLimits::from_json(r#"{"max_string_length": 4}"#).unwrap();
    let frame = receive(&ChatMessagePacket::new("hello"), ProtocolVersion::V_1_12_2)
        .unwrap()
        .with_limits(limits);
    assert_matches!(
        decode_packet::<ChatMessagePacket>(frame),
        Err(ProtocolError::StringTooLong { length: 5, max: 4 })
    );

    let frame = receive(&ChatMessagePacket::new("hi"), ProtocolVersion::V_1_12_2)
        .unwrap()
        .with_limits(limits);
    assert_eq!(decode_packet::<ChatMessagePacket>(frame).unwrap().message, "hi");
}
