//! Packets implemented on top of the wrapper, and the packet-type tables
//! that give them their per-version ids.

/// Declares a fieldless enum sent as its varint ordinal.
macro_rules! protocol_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::wrapper::ProtocolEnum for $name {
            const VALUES: &'static [Self] = &[$($name::$variant),+];

            fn ordinal(self) -> i32 {
                self as i32
            }
        }
    };
}

pub mod chat_message;
pub mod chunk_data;
pub mod client_settings;
pub mod entity_action;
pub mod keep_alive;
pub mod spawn_experience_orb;

use crate::packet::PacketType;
use crate::registry::VersionedRegistry;
use glider_common::{Direction, ProtocolVersion as V, Result};
use once_cell::sync;

type IdTable = &'static [(V, i32)];

const SERVERBOUND_IDS: &[(&str, IdTable)] = &[
    (
        "keep_alive",
        &[
            (V::V_1_7_10, 0x00),
            (V::V_1_9, 0x0B),
            (V::V_1_12, 0x0C),
            (V::V_1_12_1, 0x0B),
            (V::V_1_13, 0x0E),
            (V::V_1_14, 0x0F),
            (V::V_1_16, 0x10),
            (V::V_1_17, 0x0F),
            (V::V_1_19, 0x11),
            (V::V_1_19_1, 0x12),
            (V::V_1_19_3, 0x11),
            (V::V_1_19_4, 0x12),
            (V::V_1_20_2, 0x14),
            (V::V_1_20_3, 0x15),
            (V::V_1_20_5, 0x18),
            (V::V_1_21_2, 0x1A),
            (V::V_1_21_6, 0x1B),
        ],
    ),
    (
        "client_settings",
        &[
            (V::V_1_7_10, 0x15),
            (V::V_1_9, 0x04),
            (V::V_1_12, 0x05),
            (V::V_1_12_1, 0x04),
            (V::V_1_14, 0x05),
            (V::V_1_19, 0x07),
            (V::V_1_19_1, 0x08),
            (V::V_1_19_3, 0x07),
            (V::V_1_19_4, 0x08),
            (V::V_1_20_2, 0x09),
            (V::V_1_20_5, 0x0A),
            (V::V_1_21_2, 0x0C),
            (V::V_1_21_6, 0x0D),
        ],
    ),
    (
        "entity_action",
        &[
            (V::V_1_7_10, 0x0B),
            (V::V_1_9, 0x14),
            (V::V_1_12, 0x15),
            (V::V_1_13, 0x19),
            (V::V_1_14, 0x1B),
            (V::V_1_16, 0x1C),
            (V::V_1_17, 0x1B),
            (V::V_1_19, 0x1D),
            (V::V_1_19_1, 0x1E),
            (V::V_1_19_3, 0x1D),
            (V::V_1_19_4, 0x1E),
            (V::V_1_20_2, 0x22),
            (V::V_1_20_5, 0x25),
            (V::V_1_21_2, 0x27),
            (V::V_1_21_6, 0x29),
        ],
    ),
    (
        "chat_message",
        &[
            (V::V_1_7_10, 0x01),
            (V::V_1_9, 0x02),
            (V::V_1_12, 0x03),
            (V::V_1_12_1, 0x02),
            (V::V_1_14, 0x03),
            (V::V_1_19, 0x04),
            (V::V_1_19_1, 0x05),
            (V::V_1_20_5, 0x06),
            (V::V_1_21_2, 0x07),
            (V::V_1_21_6, 0x08),
        ],
    ),
];

const CLIENTBOUND_IDS: &[(&str, IdTable)] = &[
    (
        "keep_alive",
        &[
            (V::V_1_7_10, 0x00),
            (V::V_1_9, 0x1F),
            (V::V_1_13, 0x21),
            (V::V_1_14, 0x20),
            (V::V_1_15, 0x21),
            (V::V_1_16, 0x20),
            (V::V_1_16_2, 0x1F),
            (V::V_1_17, 0x21),
            (V::V_1_19, 0x1E),
            (V::V_1_19_1, 0x20),
            (V::V_1_19_3, 0x1F),
            (V::V_1_19_4, 0x23),
            (V::V_1_20_2, 0x24),
            (V::V_1_20_5, 0x26),
            (V::V_1_21_2, 0x27),
            (V::V_1_21_5, 0x26),
        ],
    ),
    (
        "chunk_data",
        &[
            (V::V_1_7_10, 0x21),
            (V::V_1_9, 0x20),
            (V::V_1_13, 0x22),
            (V::V_1_14, 0x21),
            (V::V_1_15, 0x22),
            (V::V_1_16, 0x21),
            (V::V_1_16_2, 0x20),
            (V::V_1_17, 0x22),
            (V::V_1_19, 0x1F),
            (V::V_1_19_1, 0x21),
            (V::V_1_19_3, 0x20),
            (V::V_1_19_4, 0x24),
            (V::V_1_20_2, 0x25),
            (V::V_1_20_5, 0x27),
            (V::V_1_21_2, 0x28),
            (V::V_1_21_5, 0x27),
        ],
    ),
    (
        "spawn_experience_orb",
        &[(V::V_1_7_10, 0x11), (V::V_1_9, 0x01), (V::V_1_19_4, 0x02)],
    ),
];

fn build_packet_types(
    key: &str,
    direction: Direction,
    table: &[(&str, IdTable)],
) -> Result<VersionedRegistry<PacketType>> {
    let mut registry = VersionedRegistry::new(key);
    for (name, ids) in table {
        let handle = registry.define(*name, |_| PacketType::new(direction))?;
        for (from, id) in ids.iter() {
            registry.bind_version(handle, *from, *id)?;
        }
    }
    registry.freeze()?;
    Ok(registry)
}

pub static SERVERBOUND: sync::Lazy<VersionedRegistry<PacketType>> = sync::Lazy::new(|| {
    build_packet_types("serverbound_packet", Direction::Serverbound, SERVERBOUND_IDS)
        .expect("serverbound packet table is consistent")
});

pub static CLIENTBOUND: sync::Lazy<VersionedRegistry<PacketType>> = sync::Lazy::new(|| {
    build_packet_types("clientbound_packet", Direction::Clientbound, CLIENTBOUND_IDS)
        .expect("clientbound packet table is consistent")
});

/// Built-in packet types for one direction.
pub fn packet_types(direction: Direction) -> &'static VersionedRegistry<PacketType> {
    match direction {
        Direction::Serverbound => &SERVERBOUND,
        Direction::Clientbound => &CLIENTBOUND,
    }
}
