use crate::buffer::FrameBuffer;
use crate::packets::packet_types;
use crate::registry::VersionedRegistry;
use crate::wrapper::PacketWrapper;
use glider_common::{CodecLimits, Direction, ProtocolError, ProtocolVersion, Result};

/// Packet trait. Packets know their registry name and how to read and write
/// their fields for the wrapper's version; the type id is resolved from a
/// packet-type registry when the frame is encoded.
pub trait Packet: Sized {
    /// Name of the packet type in its direction's registry, e.g. `keep_alive`.
    const NAME: &'static str;

    const DIRECTION: Direction;

    /// Reads the fields, positioned just after the type id.
    fn read(wrapper: &mut PacketWrapper) -> Result<Self>;

    fn write(&self, wrapper: &mut PacketWrapper) -> Result<()>;
}

/// Value stored in a packet-type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketType {
    pub direction: Direction,
}

impl PacketType {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

/// A frame split into its type id and the remaining field bytes.
#[derive(Debug)]
pub struct PacketFrame {
    pub version: ProtocolVersion,
    pub direction: Direction,
    pub type_id: i32,
    payload: FrameBuffer,
    limits: CodecLimits,
}

impl PacketFrame {
    /// Reads the type id off the front of a complete, unprefixed frame.
    pub fn parse(
        bytes: impl Into<Vec<u8>>,
        version: ProtocolVersion,
        direction: Direction,
    ) -> Result<Self> {
        let mut payload = FrameBuffer::from_bytes(bytes);
        let type_id = payload.read_varint()?;
        Ok(Self {
            version,
            direction,
            type_id,
            payload,
            limits: CodecLimits::default(),
        })
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Field bytes that follow the type id.
    pub fn payload(&self) -> &[u8] {
        self.payload.remaining()
    }

    /// True when the frame carries packet type `P` at this version.
    pub fn is<P: Packet>(&self, registry: &VersionedRegistry<PacketType>) -> bool {
        registry
            .resolve_by_network_id(self.version, self.type_id)
            .ok()
            .and_then(|handle| registry.name(handle))
            .map_or(false, |name| name.path() == P::NAME)
    }

    pub fn into_wrapper(self) -> PacketWrapper {
        PacketWrapper::reader(self.payload, self.version, self.direction).with_limits(self.limits)
    }
}

/// Encodes `packet` as type id plus fields, without the length prefix.
pub fn encode_packet_with<P: Packet>(
    registry: &VersionedRegistry<PacketType>,
    packet: &P,
    version: ProtocolVersion,
) -> Result<FrameBuffer> {
    let handle = registry
        .get_by_name(P::NAME)
        .ok_or_else(|| ProtocolError::UnmappedForVersion {
            registry: registry.key().clone(),
            name: P::NAME.into(),
            version,
        })?;
    let type_id = registry.resolve_network_id(handle, version)?;

    let mut wrapper = PacketWrapper::writer(version, P::DIRECTION);
    wrapper.write_varint(type_id);
    packet.write(&mut wrapper)?;
    Ok(wrapper.into_buffer())
}

/// Encodes with the built-in packet types of `P::DIRECTION`.
pub fn encode_packet<P: Packet>(packet: &P, version: ProtocolVersion) -> Result<FrameBuffer> {
    encode_packet_with(packet_types(P::DIRECTION), packet, version)
}

/// Decodes `frame` as `P`. The frame's type id must map to `P` at the
/// frame's version, and every payload byte must be consumed.
pub fn decode_packet_with<P: Packet>(
    registry: &VersionedRegistry<PacketType>,
    frame: PacketFrame,
) -> Result<P> {
    let handle = registry.resolve_by_network_id(frame.version, frame.type_id)?;
    let name = registry.name(handle).map(|name| name.path()).unwrap_or("");
    if name != P::NAME {
        return Err(ProtocolError::invalid_data(format!(
            "type id {:#04x} is {} at {}, not {}",
            frame.type_id,
            name,
            frame.version,
            P::NAME
        )));
    }

    let mut wrapper = frame.into_wrapper();
    let packet = P::read(&mut wrapper)?;
    let trailing = wrapper.buffer().readable_bytes();
    if trailing > 0 {
        return Err(ProtocolError::invalid_data(format!(
            "{} trailing bytes after {}",
            trailing,
            P::NAME
        )));
    }
    Ok(packet)
}

pub fn decode_packet<P: Packet>(frame: PacketFrame) -> Result<P> {
    decode_packet_with(packet_types(P::DIRECTION), frame)
}
