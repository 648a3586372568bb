//! Version-aware packet reader/writer.
//!
//! A `PacketWrapper` owns the buffer of exactly one frame together with the
//! negotiated protocol version, so packet code can branch on
//! `version().is_older_than(..)` and read the field sequence that version
//! sends. It is never reused across frames.

use crate::buffer::FrameBuffer;
use crate::holder::{Holder, HolderSet, MaybeMapped};
use crate::registry::{Handle, VersionedRegistry};
use bytes::Bytes;
use glider_common::{
    BlockPosition, CodecLimits, Direction, Identifier, ProtocolError, ProtocolVersion, Result,
};
use glider_nbt::Tag;
use uuid::Uuid;

/// Enums sent as a varint ordinal.
pub trait ProtocolEnum: Sized + Copy + 'static {
    /// Every variant, in ordinal order.
    const VALUES: &'static [Self];

    fn ordinal(self) -> i32;

    fn from_ordinal(ordinal: i32) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::VALUES.get(i).copied())
    }
}

/// Types stored as NBT whose layout depends on the protocol version.
pub trait NbtCodec: Sized {
    fn decode_nbt(tag: &Tag, version: ProtocolVersion) -> Result<Self>;

    fn encode_nbt(&self, version: ProtocolVersion) -> Result<Tag>;
}

macro_rules! passthrough {
    ($($read:ident, $write:ident => $ty:ty;)*) => {
        $(
            pub fn $read(&mut self) -> Result<$ty> {
                self.buffer.$read()
            }

            pub fn $write(&mut self, value: $ty) {
                self.buffer.$write(value)
            }
        )*
    };
}

#[derive(Debug)]
pub struct PacketWrapper {
    buffer: FrameBuffer,
    version: ProtocolVersion,
    direction: Direction,
    limits: CodecLimits,
}

impl PacketWrapper {
    /// Wraps a complete frame for decoding.
    pub fn reader(buffer: FrameBuffer, version: ProtocolVersion, direction: Direction) -> Self {
        Self {
            buffer,
            version,
            direction,
            limits: CodecLimits::default(),
        }
    }

    /// Creates an empty wrapper for encoding.
    pub fn writer(version: ProtocolVersion, direction: Direction) -> Self {
        Self::reader(FrameBuffer::new(), version, direction)
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> FrameBuffer {
        self.buffer
    }

    pub fn into_bytes(self) -> Bytes {
        self.buffer.into_bytes()
    }

    pub fn is_readable(&self) -> bool {
        self.buffer.is_readable()
    }

    passthrough! {
        read_u8, write_u8 => u8;
        read_i8, write_i8 => i8;
        read_bool, write_bool => bool;
        read_u16, write_u16 => u16;
        read_i16, write_i16 => i16;
        read_i32, write_i32 => i32;
        read_i64, write_i64 => i64;
        read_u64, write_u64 => u64;
        read_f32, write_f32 => f32;
        read_f64, write_f64 => f64;
        read_varint, write_varint => i32;
        read_varlong, write_varlong => i64;
        read_uuid, write_uuid => Uuid;
    }

    /// Reads a varint-prefixed string, failing with `StringTooLong` past
    /// `max_len` characters.
    pub fn read_string(&mut self, max_len: usize) -> Result<String> {
        self.buffer.read_string(max_len.min(self.limits.max_string_length))
    }

    pub fn write_string(&mut self, value: &str) {
        self.buffer.write_string(value)
    }

    pub fn read_identifier(&mut self) -> Result<Identifier> {
        Ok(Identifier::parse(&self.read_string(self.limits.max_string_length)?))
    }

    pub fn write_identifier(&mut self, value: &Identifier) {
        self.write_string(&value.to_string())
    }

    /// Reads a varint length and checks it against the array limit.
    pub fn read_length(&mut self) -> Result<usize> {
        self.read_bounded_length(self.limits.max_array_length)
    }

    fn read_bounded_length(&mut self, max: usize) -> Result<usize> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(ProtocolError::invalid_data(format!(
                "negative length {}",
                length
            )));
        }
        let length = length as usize;
        if length > max {
            return Err(ProtocolError::ArrayTooLong { length, max });
        }
        Ok(length)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        Ok(self.buffer.read_bytes(length)?.to_vec())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.write_bytes(bytes)
    }

    /// Varint-prefixed byte array, bounded by the frame length limit.
    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let length = self.read_bounded_length(self.limits.max_frame_length)?;
        self.read_bytes(length)
    }

    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as i32);
        self.write_bytes(bytes);
    }

    pub fn read_remaining(&mut self) -> Vec<u8> {
        self.buffer.read_remaining().to_vec()
    }

    /// A presence boolean, then the value if present.
    pub fn read_optional<T, F>(&mut self, reader: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.read_bool()? {
            Ok(Some(reader(self)?))
        } else {
            Ok(None)
        }
    }

    pub fn write_optional<T, F>(&mut self, value: Option<&T>, writer: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &T) -> Result<()>,
    {
        match value {
            Some(value) => {
                self.write_bool(true);
                writer(self, value)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    /// A varint count, then that many elements. The count is checked before
    /// anything is allocated.
    pub fn read_array<T, F>(&mut self, mut reader: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let length = self.read_length()?;
        // the count alone cannot be trusted for the allocation size
        let mut values = Vec::with_capacity(length.min(self.buffer.readable_bytes()));
        for _ in 0..length {
            values.push(reader(self)?);
        }
        Ok(values)
    }

    pub fn write_array<T, F>(&mut self, values: &[T], mut writer: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.write_varint(values.len() as i32);
        for value in values {
            writer(self, value)?;
        }
        Ok(())
    }

    /// Varint-prefixed array of longs, also the wire form of a bitset.
    pub fn read_long_array(&mut self) -> Result<Vec<i64>> {
        self.read_array(|w| w.read_i64())
    }

    pub fn write_long_array(&mut self, values: &[i64]) {
        self.write_varint(values.len() as i32);
        for value in values {
            self.write_i64(*value);
        }
    }

    /// A bitset of `bits` bits sent as exactly `ceil(bits / 8)` bytes.
    pub fn read_fixed_bitset(&mut self, bits: usize) -> Result<Vec<u8>> {
        self.read_bytes((bits + 7) / 8)
    }

    /// Writes `bytes` as a fixed bitset, zero-padding or truncating it to
    /// `ceil(bits / 8)` bytes.
    pub fn write_fixed_bitset(&mut self, bytes: &[u8], bits: usize) {
        for i in 0..(bits + 7) / 8 {
            self.write_u8(bytes.get(i).copied().unwrap_or(0));
        }
    }

    pub fn read_enum<E: ProtocolEnum>(&mut self) -> Result<E> {
        let ordinal = self.read_varint()?;
        E::from_ordinal(ordinal).ok_or_else(|| {
            ProtocolError::invalid_data(format!(
                "unknown {} ordinal {}",
                std::any::type_name::<E>(),
                ordinal
            ))
        })
    }

    pub fn write_enum<E: ProtocolEnum>(&mut self, value: E) {
        self.write_varint(value.ordinal())
    }

    /// Block position packed into one long. The field order changed in 1.14.
    pub fn read_position(&mut self) -> Result<BlockPosition> {
        let value = self.read_i64()?;
        let x = (value >> 38) as i32;
        if self.version.is_newer_than_or_equals(ProtocolVersion::V_1_14) {
            let y = (value << 52 >> 52) as i32;
            let z = (value << 26 >> 38) as i32;
            Ok(BlockPosition::new(x, y, z))
        } else {
            let y = (value << 26 >> 52) as i32;
            let z = (value << 38 >> 38) as i32;
            Ok(BlockPosition::new(x, y, z))
        }
    }

    pub fn write_position(&mut self, position: BlockPosition) {
        let x = (position.x as i64 & 0x3FF_FFFF) << 38;
        let y = position.y as i64 & 0xFFF;
        let z = position.z as i64 & 0x3FF_FFFF;
        let value = if self.version.is_newer_than_or_equals(ProtocolVersion::V_1_14) {
            x | (z << 12) | y
        } else {
            x | (y << 26) | z
        };
        self.write_i64(value);
    }

    /// Reads an NBT tree; from 1.20.2 the root carries no name.
    pub fn read_nbt(&mut self) -> Result<Tag> {
        let depth = self.limits.max_nbt_depth;
        if self.version.is_newer_than_or_equals(ProtocolVersion::V_1_20_2) {
            Ok(Tag::read_nameless(&mut self.buffer, depth)?)
        } else {
            let (_, tag) = Tag::read_with_depth(&mut self.buffer, depth)?;
            Ok(tag)
        }
    }

    pub fn write_nbt(&mut self, tag: &Tag) -> Result<()> {
        if self.version.is_newer_than_or_equals(ProtocolVersion::V_1_20_2) {
            tag.write_nameless(&mut self.buffer)?;
        } else {
            tag.write(&mut self.buffer, "")?;
        }
        Ok(())
    }

    pub fn read_nbt_as<T: NbtCodec>(&mut self) -> Result<T> {
        let tag = self.read_nbt()?;
        T::decode_nbt(&tag, self.version)
    }

    pub fn write_nbt_as<T: NbtCodec>(&mut self, value: &T) -> Result<()> {
        let tag = value.encode_nbt(self.version)?;
        self.write_nbt(&tag)
    }

    /// Reads a network id and resolves it for this wrapper's version.
    pub fn read_mapped_entity<T>(&mut self, registry: &VersionedRegistry<T>) -> Result<Handle<T>> {
        let id = self.read_varint()?;
        registry.resolve_by_network_id(self.version, id)
    }

    pub fn write_mapped_entity<T>(
        &mut self,
        registry: &VersionedRegistry<T>,
        handle: Handle<T>,
    ) -> Result<()> {
        let id = registry.resolve_network_id(handle, self.version)?;
        self.write_varint(id);
        Ok(())
    }

    /// Reads a holder: `0` then an inline value, or a network id plus one.
    pub fn read_mapped_entity_or_direct<T, D, F>(
        &mut self,
        registry: &VersionedRegistry<T>,
        direct_reader: F,
    ) -> Result<Holder<T, D>>
    where
        F: FnOnce(&mut Self) -> Result<D>,
    {
        let id = self.read_varint()?;
        if id == 0 {
            return Ok(Holder::Direct(direct_reader(self)?));
        }
        if id < 0 {
            return Err(ProtocolError::invalid_data(format!("negative holder id {}", id)));
        }
        let handle = registry.resolve_by_network_id(self.version, id - 1)?;
        Ok(Holder::Reference(handle))
    }

    pub fn write_mapped_entity_or_direct<T, D, F>(
        &mut self,
        registry: &VersionedRegistry<T>,
        holder: &Holder<T, D>,
        direct_writer: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Self, &D) -> Result<()>,
    {
        match holder {
            Holder::Reference(handle) => {
                let id = registry.resolve_network_id(*handle, self.version)?;
                let wire_id = id.checked_add(1).ok_or_else(|| {
                    ProtocolError::invalid_data(format!("network id {} has no holder form", id))
                })?;
                self.write_varint(wire_id);
                Ok(())
            }
            Holder::Direct(value) => {
                self.write_varint(0);
                direct_writer(self, value)
            }
        }
    }

    pub fn read_holder_set<T>(&mut self, registry: &VersionedRegistry<T>) -> Result<HolderSet<T>> {
        let length = self.read_length_with_sentinel()?;
        match length {
            None => Ok(HolderSet::Tag(self.read_identifier()?)),
            Some(count) => {
                let mut handles = Vec::with_capacity(count.min(self.buffer.readable_bytes()));
                for _ in 0..count {
                    handles.push(self.read_mapped_entity(registry)?);
                }
                Ok(HolderSet::Direct(handles))
            }
        }
    }

    pub fn write_holder_set<T>(
        &mut self,
        registry: &VersionedRegistry<T>,
        set: &HolderSet<T>,
    ) -> Result<()> {
        match set {
            HolderSet::Tag(tag) => {
                self.write_varint(0);
                self.write_identifier(tag);
            }
            HolderSet::Direct(handles) => {
                let count = i32::try_from(handles.len())
                    .ok()
                    .and_then(|len| len.checked_add(1))
                    .ok_or_else(|| {
                        ProtocolError::invalid_data(format!(
                            "holder set of {} entries cannot be counted",
                            handles.len()
                        ))
                    })?;
                self.write_varint(count);
                for handle in handles {
                    self.write_mapped_entity(registry, *handle)?;
                }
            }
        }
        Ok(())
    }

    // varint `count + 1`, where 0 stands for "no count"
    fn read_length_with_sentinel(&mut self) -> Result<Option<usize>> {
        let raw = self.read_varint()?;
        if raw == 0 {
            return Ok(None);
        }
        if raw < 0 {
            return Err(ProtocolError::invalid_data(format!("negative length {}", raw)));
        }
        let length = raw as usize - 1;
        if length > self.limits.max_array_length {
            return Err(ProtocolError::ArrayTooLong {
                length,
                max: self.limits.max_array_length,
            });
        }
        Ok(Some(length))
    }

    /// A boolean, then an inline value (`true`) or an entry name (`false`).
    pub fn read_maybe_mapped<D, F>(&mut self, direct_reader: F) -> Result<MaybeMapped<D>>
    where
        F: FnOnce(&mut Self) -> Result<D>,
    {
        if self.read_bool()? {
            Ok(MaybeMapped::Direct(direct_reader(self)?))
        } else {
            Ok(MaybeMapped::Named(self.read_identifier()?))
        }
    }

    pub fn write_maybe_mapped<D, F>(&mut self, value: &MaybeMapped<D>, direct_writer: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &D) -> Result<()>,
    {
        match value {
            MaybeMapped::Direct(direct) => {
                self.write_bool(true);
                direct_writer(self, direct)
            }
            MaybeMapped::Named(name) => {
                self.write_bool(false);
                self.write_identifier(name);
                Ok(())
            }
        }
    }
}
