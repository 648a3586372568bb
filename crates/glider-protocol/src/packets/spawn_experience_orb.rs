use crate::packet::Packet;
use crate::wrapper::PacketWrapper;
use glider_common::{Direction, ProtocolVersion, Result};

/// Coordinates before 1.9 are fixed-point: 1/32 of a block.
const FIXED_POINT_SCALE: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnExperienceOrbPacket {
    pub entity_id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub count: i16,
}

impl SpawnExperienceOrbPacket {
    pub fn new(entity_id: i32, x: f64, y: f64, z: f64, count: i16) -> Self {
        Self {
            entity_id,
            x,
            y,
            z,
            count,
        }
    }
}

impl Packet for SpawnExperienceOrbPacket {
    const NAME: &'static str = "spawn_experience_orb";
    const DIRECTION: Direction = Direction::Clientbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let entity_id = wrapper.read_varint()?;
        let (x, y, z) = if wrapper.version().is_newer_than_or_equals(ProtocolVersion::V_1_9) {
            (wrapper.read_f64()?, wrapper.read_f64()?, wrapper.read_f64()?)
        } else {
            (
                wrapper.read_i32()? as f64 / FIXED_POINT_SCALE,
                wrapper.read_i32()? as f64 / FIXED_POINT_SCALE,
                wrapper.read_i32()? as f64 / FIXED_POINT_SCALE,
            )
        };
        let count = wrapper.read_i16()?;
        Ok(Self::new(entity_id, x, y, z, count))
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        wrapper.write_varint(self.entity_id);
        if wrapper.version().is_newer_than_or_equals(ProtocolVersion::V_1_9) {
            wrapper.write_f64(self.x);
            wrapper.write_f64(self.y);
            wrapper.write_f64(self.z);
        } else {
            for coordinate in [self.x, self.y, self.z] {
                wrapper.write_i32((coordinate * FIXED_POINT_SCALE).floor() as i32);
            }
        }
        wrapper.write_i16(self.count);
        Ok(())
    }
}
