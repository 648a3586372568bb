//! Version-aware codec for the Minecraft Java Edition wire protocol.
//!
//! Packets are read and written through a [`PacketWrapper`], which carries the
//! protocol version of the connection so that every field can pick its
//! layout. Ids that change between versions go through a frozen
//! [`VersionedRegistry`].

pub mod buffer;
pub mod cancel;
pub mod chunk;
pub mod data;
pub mod frame;
pub mod holder;
pub mod mappings;
pub mod packet;
pub mod packets;
pub mod palette;
pub mod registry;
pub mod synced;
pub mod varint;
pub mod wrapper;

pub use buffer::FrameBuffer;
pub use cancel::{cancel, catch_cancel, Outcome, CANCELLED};
pub use chunk::ChunkSection;
pub use frame::{send_packet, FrameCodec};
pub use holder::{Holder, HolderSet, MaybeMapped};
pub use mappings::MappingTable;
pub use packet::{
    decode_packet, decode_packet_with, encode_packet, encode_packet_with, Packet, PacketFrame,
    PacketType,
};
pub use packets::packet_types;
pub use palette::{DataPalette, PaletteType};
pub use registry::{Handle, VersionedRegistry};
pub use synced::{RegistryData, RegistryElement};
pub use wrapper::{NbtCodec, PacketWrapper, ProtocolEnum};
