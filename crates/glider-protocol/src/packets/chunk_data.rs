use crate::buffer::FrameBuffer;
use crate::chunk::ChunkSection;
use crate::packet::Packet;
use crate::palette::PaletteFormat;
use crate::wrapper::{PacketWrapper, ProtocolEnum};
use glider_common::{Direction, ProtocolError, ProtocolVersion, Result};
use glider_nbt::Tag;

protocol_enum! {
    pub enum HeightmapType {
        WorldSurfaceWg,
        WorldSurface,
        OceanFloorWg,
        OceanFloor,
        MotionBlocking,
        MotionBlockingNoLeaves,
    }
}

impl HeightmapType {
    /// Key of this heightmap in the NBT form used before 1.21.5.
    pub fn nbt_key(self) -> &'static str {
        match self {
            HeightmapType::WorldSurfaceWg => "WORLD_SURFACE_WG",
            HeightmapType::WorldSurface => "WORLD_SURFACE",
            HeightmapType::OceanFloorWg => "OCEAN_FLOOR_WG",
            HeightmapType::OceanFloor => "OCEAN_FLOOR",
            HeightmapType::MotionBlocking => "MOTION_BLOCKING",
            HeightmapType::MotionBlockingNoLeaves => "MOTION_BLOCKING_NO_LEAVES",
        }
    }
}

/// A block entity inside a chunk column, positioned relative to the column.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    /// `x << 4 | z`, both in `0..16`
    pub packed_xz: u8,
    pub y: i16,
    pub type_id: i32,
    pub data: Tag,
}

impl BlockEntity {
    pub fn new(x: u8, y: i16, z: u8, type_id: i32, data: Tag) -> Self {
        Self {
            packed_xz: (x & 15) << 4 | (z & 15),
            y,
            type_id,
            data,
        }
    }

    pub fn x(&self) -> u8 {
        self.packed_xz >> 4
    }

    pub fn z(&self) -> u8 {
        self.packed_xz & 15
    }
}

/// Sky and block light for the sections of a column, plus one section
/// below and above it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LightData {
    /// Only sent before 1.20.
    pub trust_edges: bool,
    pub sky_mask: Vec<i64>,
    pub block_mask: Vec<i64>,
    pub empty_sky_mask: Vec<i64>,
    pub empty_block_mask: Vec<i64>,
    /// 2048-byte nibble arrays, one per set bit of the matching mask.
    pub sky_light: Vec<Vec<u8>>,
    pub block_light: Vec<Vec<u8>>,
}

impl LightData {
    pub fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let trust_edges = if wrapper.version().is_older_than(ProtocolVersion::V_1_20) {
            wrapper.read_bool()?
        } else {
            false
        };
        Ok(Self {
            trust_edges,
            sky_mask: wrapper.read_long_array()?,
            block_mask: wrapper.read_long_array()?,
            empty_sky_mask: wrapper.read_long_array()?,
            empty_block_mask: wrapper.read_long_array()?,
            sky_light: wrapper.read_array(|w| w.read_byte_array())?,
            block_light: wrapper.read_array(|w| w.read_byte_array())?,
        })
    }

    pub fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        if wrapper.version().is_older_than(ProtocolVersion::V_1_20) {
            wrapper.write_bool(self.trust_edges);
        }
        wrapper.write_long_array(&self.sky_mask);
        wrapper.write_long_array(&self.block_mask);
        wrapper.write_long_array(&self.empty_sky_mask);
        wrapper.write_long_array(&self.empty_block_mask);
        wrapper.write_array(&self.sky_light, |w, light| {
            w.write_byte_array(light);
            Ok(())
        })?;
        wrapper.write_array(&self.block_light, |w, light| {
            w.write_byte_array(light);
            Ok(())
        })
    }
}

/// A full chunk column in the 1.18+ layout.
///
/// Section data stays encoded until asked for, since decoding it needs the
/// dimension's section count.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDataPacket {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub heightmaps: Vec<(HeightmapType, Vec<i64>)>,
    pub data: Vec<u8>,
    pub block_entities: Vec<BlockEntity>,
    pub light: LightData,
}

fn check_version(version: ProtocolVersion) -> Result<()> {
    if version.is_older_than(ProtocolVersion::V_1_18) {
        return Err(ProtocolError::invalid_data(format!(
            "chunk data layout of {} is not supported",
            version
        )));
    }
    Ok(())
}

impl ChunkDataPacket {
    pub fn new(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            chunk_x,
            chunk_z,
            heightmaps: Vec::new(),
            data: Vec::new(),
            block_entities: Vec::new(),
            light: LightData::default(),
        }
    }

    pub fn heightmap(&self, kind: HeightmapType) -> Option<&[i64]> {
        self.heightmaps
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, values)| values.as_slice())
    }

    /// Decodes `section_count` sections from the data bytes. Every byte must
    /// be accounted for.
    pub fn sections(
        &self,
        section_count: usize,
        version: ProtocolVersion,
    ) -> Result<Vec<ChunkSection>> {
        check_version(version)?;
        let format = PaletteFormat::for_version(version);
        let mut buffer = FrameBuffer::from_bytes(self.data.clone());
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            sections.push(ChunkSection::read(&mut buffer, format)?);
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            let padding: usize = sections.iter().map(ChunkSection::dropped_prefix_len).sum();
            buffer.skip(padding)?;
        }
        if buffer.is_readable() {
            return Err(ProtocolError::invalid_data(format!(
                "{} bytes left after {} sections of chunk {}, {}",
                buffer.readable_bytes(),
                section_count,
                self.chunk_x,
                self.chunk_z
            )));
        }
        Ok(sections)
    }

    /// Replaces the data bytes with `sections` encoded for `version`.
    pub fn set_sections(
        &mut self,
        sections: &[ChunkSection],
        version: ProtocolVersion,
    ) -> Result<()> {
        check_version(version)?;
        let format = PaletteFormat::for_version(version);
        let mut buffer = FrameBuffer::new();
        for section in sections {
            section.write(&mut buffer, format);
        }
        if version.is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            let padding: usize = sections.iter().map(ChunkSection::dropped_prefix_len).sum();
            buffer.write_bytes(&vec![0; padding]);
        }
        self.data = buffer.into_inner();
        Ok(())
    }

    fn read_heightmaps(wrapper: &mut PacketWrapper) -> Result<Vec<(HeightmapType, Vec<i64>)>> {
        if wrapper.version().is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            return wrapper.read_array(|w| Ok((w.read_enum()?, w.read_long_array()?)));
        }

        let tag = wrapper.read_nbt()?;
        let mut heightmaps = Vec::new();
        for kind in HeightmapType::VALUES {
            if let Some(values) = tag.get_opt::<Vec<i64>>(kind.nbt_key())? {
                heightmaps.push((*kind, values));
            }
        }
        Ok(heightmaps)
    }

    fn write_heightmaps(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        if wrapper.version().is_newer_than_or_equals(ProtocolVersion::V_1_21_5) {
            return wrapper.write_array(&self.heightmaps, |w, (kind, values)| {
                w.write_enum(*kind);
                w.write_long_array(values);
                Ok(())
            });
        }

        let mut tag = Tag::compound();
        for (kind, values) in &self.heightmaps {
            tag.set(kind.nbt_key(), values.clone())?;
        }
        wrapper.write_nbt(&tag)
    }
}

impl Packet for ChunkDataPacket {
    const NAME: &'static str = "chunk_data";
    const DIRECTION: Direction = Direction::Clientbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        check_version(wrapper.version())?;
        let chunk_x = wrapper.read_i32()?;
        let chunk_z = wrapper.read_i32()?;
        let heightmaps = Self::read_heightmaps(wrapper)?;
        let data = wrapper.read_byte_array()?;
        let block_entities = wrapper.read_array(|w| {
            let packed_xz = w.read_u8()?;
            let y = w.read_i16()?;
            let type_id = w.read_varint()?;
            let data = w.read_nbt()?;
            Ok(BlockEntity {
                packed_xz,
                y,
                type_id,
                data,
            })
        })?;
        let light = LightData::read(wrapper)?;

        Ok(Self {
            chunk_x,
            chunk_z,
            heightmaps,
            data,
            block_entities,
            light,
        })
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        check_version(wrapper.version())?;
        wrapper.write_i32(self.chunk_x);
        wrapper.write_i32(self.chunk_z);
        self.write_heightmaps(wrapper)?;
        wrapper.write_byte_array(&self.data);
        wrapper.write_array(&self.block_entities, |w, entity| {
            w.write_u8(entity.packed_xz);
            w.write_i16(entity.y);
            w.write_varint(entity.type_id);
            w.write_nbt(&entity.data)
        })?;
        self.light.write(wrapper)
    }
}
