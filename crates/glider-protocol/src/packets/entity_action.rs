use crate::packet::Packet;
use crate::registry::VersionedRegistry;
use crate::wrapper::PacketWrapper;
use glider_common::{Direction, ProtocolError, ProtocolVersion as V, Result};
use once_cell::sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Removed in 1.21.6; sneaking moved to the input packet.
    StartSneaking,
    StopSneaking,
    LeaveBed,
    StartSprinting,
    StopSprinting,
    StartJumpingWithHorse,
    StopJumpingWithHorse,
    OpenHorseInventory,
    StartFlyingWithElytra,
}

/// Per-version action ids. `None` retires the action from that version on.
const ACTION_IDS: &[(&str, Action, &[(V, Option<i32>)])] = &[
    (
        "start_sneaking",
        Action::StartSneaking,
        &[(V::V_1_7_10, Some(0)), (V::V_1_21_6, None)],
    ),
    (
        "stop_sneaking",
        Action::StopSneaking,
        &[(V::V_1_7_10, Some(1)), (V::V_1_21_6, None)],
    ),
    (
        "leave_bed",
        Action::LeaveBed,
        &[(V::V_1_7_10, Some(2)), (V::V_1_21_6, Some(0))],
    ),
    (
        "start_sprinting",
        Action::StartSprinting,
        &[(V::V_1_7_10, Some(3)), (V::V_1_21_6, Some(1))],
    ),
    (
        "stop_sprinting",
        Action::StopSprinting,
        &[(V::V_1_7_10, Some(4)), (V::V_1_21_6, Some(2))],
    ),
    (
        "start_jumping_with_horse",
        Action::StartJumpingWithHorse,
        &[(V::V_1_7_10, Some(5)), (V::V_1_21_6, Some(3))],
    ),
    (
        "stop_jumping_with_horse",
        Action::StopJumpingWithHorse,
        &[(V::V_1_9, Some(6)), (V::V_1_21_6, Some(4))],
    ),
    (
        "open_horse_inventory",
        Action::OpenHorseInventory,
        &[
            (V::V_1_7_10, Some(6)),
            (V::V_1_9, Some(7)),
            (V::V_1_21_6, Some(5)),
        ],
    ),
    (
        "start_flying_with_elytra",
        Action::StartFlyingWithElytra,
        &[(V::V_1_9, Some(8)), (V::V_1_21_6, Some(6))],
    ),
];

fn build_actions() -> Result<VersionedRegistry<Action>> {
    let mut registry = VersionedRegistry::new("entity_action");
    for (name, action, ids) in ACTION_IDS {
        let handle = registry.define(*name, |_| *action)?;
        for (from, id) in ids.iter() {
            match id {
                Some(id) => registry.bind_version(handle, *from, *id)?,
                None => registry.retire(handle, *from)?,
            }
        }
    }
    registry.freeze()?;
    Ok(registry)
}

pub static ACTIONS: sync::Lazy<VersionedRegistry<Action>> =
    sync::Lazy::new(|| build_actions().expect("entity action table is consistent"));

impl Action {
    pub fn name(self) -> &'static str {
        ACTION_IDS
            .iter()
            .find(|(_, action, _)| *action == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("unknown")
    }

    /// Wire id at `version`; fails for actions the version does not have.
    pub fn network_id(self, version: V) -> Result<i32> {
        let handle = ACTIONS.get_by_name(self.name()).ok_or_else(|| {
            ProtocolError::invalid_data(format!("{:?} is not a registered action", self))
        })?;
        ACTIONS.resolve_network_id(handle, version)
    }

    pub fn from_network_id(version: V, id: i32) -> Result<Self> {
        ACTIONS.value_by_network_id(version, id).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityActionPacket {
    pub entity_id: i32,
    pub action: Action,
    /// Horse jump strength, 0 to 100
    pub jump_boost: i32,
}

impl EntityActionPacket {
    pub fn new(entity_id: i32, action: Action, jump_boost: i32) -> Self {
        Self {
            entity_id,
            action,
            jump_boost,
        }
    }
}

impl Packet for EntityActionPacket {
    const NAME: &'static str = "entity_action";
    const DIRECTION: Direction = Direction::Serverbound;

    fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let version = wrapper.version();
        if version.is_newer_than_or_equals(V::V_1_8) {
            let entity_id = wrapper.read_varint()?;
            let handle = wrapper.read_mapped_entity(&*ACTIONS)?;
            let action = ACTIONS
                .get(handle)
                .copied()
                .ok_or_else(|| ProtocolError::invalid_data("dangling action handle"))?;
            let jump_boost = wrapper.read_varint()?;
            Ok(Self::new(entity_id, action, jump_boost))
        } else {
            let entity_id = wrapper.read_i32()?;
            let action = Action::from_network_id(version, wrapper.read_i8()? as i32)?;
            let jump_boost = wrapper.read_i32()?;
            Ok(Self::new(entity_id, action, jump_boost))
        }
    }

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        let action_id = self.action.network_id(wrapper.version())?;
        if wrapper.version().is_newer_than_or_equals(V::V_1_8) {
            wrapper.write_varint(self.entity_id);
            wrapper.write_varint(action_id);
            wrapper.write_varint(self.jump_boost);
        } else {
            wrapper.write_i32(self.entity_id);
            wrapper.write_i8(action_id as i8);
            wrapper.write_i32(self.jump_boost);
        }
        Ok(())
    }
}
