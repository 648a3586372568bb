//! Glider: a versioned Minecraft wire-protocol codec.
//!
//! This crate only re-exports the workspace members; see
//! [`glider_protocol`] for the codec itself.

pub use glider_common as common;
pub use glider_nbt as nbt;
pub use glider_protocol as protocol;

pub use glider_common::{
    BlockPosition, CodecLimits, Direction, Identifier, ProtocolError, ProtocolVersion, Result,
};
pub use glider_protocol::{FrameBuffer, Packet, PacketWrapper, VersionedRegistry};
