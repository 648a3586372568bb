//! Binary tag trees (NBT) as embedded in protocol frames and mapping files.
//!
//! The protocol core only needs a narrow surface from this crate: reading and
//! writing a tree (with or without a root name), key lookup by string, typed
//! get-or-fail and typed set.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Default nesting limit for compounds and lists.
pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid tag type: {0}")]
    InvalidTagType(u8),

    #[error("invalid UTF-8 in string tag")]
    InvalidString,

    #[error("negative length {0}")]
    NegativeLength(i32),

    #[error("list of {0} end tags")]
    EndList(usize),

    #[error("tag nesting exceeds {0} levels")]
    DepthExceeded(usize),

    #[error("missing key '{0}'")]
    MissingKey(String),

    #[error("key '{key}' holds {found}, expected {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("not a compound tag")]
    NotCompound,
}

pub type Result<T> = std::result::Result<T, NbtError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(HashMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Tag::End => "end",
            Tag::Byte(_) => "byte",
            Tag::Short(_) => "short",
            Tag::Int(_) => "int",
            Tag::Long(_) => "long",
            Tag::Float(_) => "float",
            Tag::Double(_) => "double",
            Tag::ByteArray(_) => "byte array",
            Tag::String(_) => "string",
            Tag::List(_) => "list",
            Tag::Compound(_) => "compound",
            Tag::IntArray(_) => "int array",
            Tag::LongArray(_) => "long array",
        }
    }

    /// Creates an empty compound tag.
    pub fn compound() -> Self {
        Tag::Compound(HashMap::new())
    }

    /// Reads a named tag (type id, name, payload).
    pub fn read<R: Read>(reader: &mut R) -> Result<(String, Tag)> {
        Self::read_with_depth(reader, DEFAULT_MAX_DEPTH)
    }

    pub fn read_with_depth<R: Read>(reader: &mut R, max_depth: usize) -> Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok(("".to_owned(), Tag::End));
        }

        let name = read_string(reader)?;
        let tag = Tag::read_payload(reader, type_id, 0, max_depth)?;
        Ok((name, tag))
    }

    /// Reads a tag in the network layout, where the root carries no name.
    pub fn read_nameless<R: Read>(reader: &mut R, max_depth: usize) -> Result<Tag> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok(Tag::End);
        }
        Tag::read_payload(reader, type_id, 0, max_depth)
    }

    fn read_payload<R: Read>(
        reader: &mut R,
        type_id: u8,
        depth: usize,
        max_depth: usize,
    ) -> Result<Tag> {
        if depth > max_depth {
            return Err(NbtError::DepthExceeded(max_depth));
        }
        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            7 => {
                let length = read_length(reader)?;
                // grows with the bytes actually read, not the declared length
                let mut bytes = Vec::with_capacity(length.min(4096));
                reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
                if bytes.len() < length {
                    return Err(NbtError::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
            }
            8 => Ok(Tag::String(read_string(reader)?)),
            9 => {
                let list_type = reader.read_u8()?;
                let length = read_length(reader)?;
                // end tags carry no payload, so only an empty list may use them
                if list_type == 0 && length > 0 {
                    return Err(NbtError::EndList(length));
                }
                let mut list = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, list_type, depth + 1, max_depth)?);
                }
                Ok(Tag::List(list))
            }
            10 => {
                let mut compound = HashMap::new();
                loop {
                    let type_id = reader.read_u8()?;
                    if type_id == 0 {
                        break;
                    }
                    let name = read_string(reader)?;
                    let tag = Tag::read_payload(reader, type_id, depth + 1, max_depth)?;
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            11 => {
                let length = read_length(reader)?;
                let mut ints = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    ints.push(reader.read_i32::<BigEndian>()?);
                }
                Ok(Tag::IntArray(ints))
            }
            12 => {
                let length = read_length(reader)?;
                let mut longs = Vec::with_capacity(length.min(4096));
                for _ in 0..length {
                    longs.push(reader.read_i64::<BigEndian>()?);
                }
                Ok(Tag::LongArray(longs))
            }
            _ => Err(NbtError::InvalidTagType(type_id)),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_string(writer, name)?;
        }

        self.write_payload(writer)
    }

    /// Writes the tag in the network layout, without a root name.
    pub fn write_nameless<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.get_type_id())?;
        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Tag::End => {}
            Tag::Byte(v) => writer.write_i8(*v)?,
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v)?,
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v)?,
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v)?,
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v)?,
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v)?,
            Tag::ByteArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for &b in v {
                    writer.write_i8(b)?;
                }
            }
            Tag::String(v) => write_string(writer, v)?,
            Tag::List(v) => {
                if v.is_empty() {
                    writer.write_u8(0)?; // TAG_End for empty lists
                } else {
                    writer.write_u8(v[0].get_type_id())?;
                }
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write(writer, name)?;
                }
                writer.write_u8(0)?;
            }
            Tag::IntArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for &i in v {
                    writer.write_i32::<BigEndian>(i)?;
                }
            }
            Tag::LongArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for &l in v {
                    writer.write_i64::<BigEndian>(l)?;
                }
            }
        }
        Ok(())
    }

    pub fn as_compound(&self) -> Option<&HashMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Tag>> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Looks up `key` in a compound tag.
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.as_compound()?.get(key)
    }

    /// Looks up `key`, failing if this is not a compound or the key is absent.
    pub fn get_or_err(&self, key: &str) -> Result<&Tag> {
        let compound = self.as_compound().ok_or(NbtError::NotCompound)?;
        compound
            .get(key)
            .ok_or_else(|| NbtError::MissingKey(key.to_owned()))
    }

    /// Typed get-or-fail.
    pub fn get_as<T: FromTag>(&self, key: &str) -> Result<T> {
        let tag = self.get_or_err(key)?;
        T::from_tag(tag).ok_or_else(|| NbtError::WrongType {
            key: key.to_owned(),
            expected: T::EXPECTED,
            found: tag.type_name(),
        })
    }

    /// Typed optional get; a present key of the wrong type is still an error.
    pub fn get_opt<T: FromTag>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(tag) => T::from_tag(tag)
                .map(Some)
                .ok_or_else(|| NbtError::WrongType {
                    key: key.to_owned(),
                    expected: T::EXPECTED,
                    found: tag.type_name(),
                }),
        }
    }

    /// Typed set on a compound tag, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Tag>) -> Result<Option<Tag>> {
        match self {
            Tag::Compound(map) => Ok(map.insert(key.into(), value.into())),
            _ => Err(NbtError::NotCompound),
        }
    }
}

/// Conversion used by [`Tag::get_as`].
pub trait FromTag: Sized {
    const EXPECTED: &'static str;

    fn from_tag(tag: &Tag) -> Option<Self>;
}

macro_rules! tag_conversions {
    ($($ty:ty => $variant:ident, $name:literal;)*) => {
        $(
            impl FromTag for $ty {
                const EXPECTED: &'static str = $name;

                fn from_tag(tag: &Tag) -> Option<Self> {
                    match tag {
                        Tag::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Tag {
                fn from(value: $ty) -> Self {
                    Tag::$variant(value)
                }
            }
        )*
    };
}

tag_conversions! {
    i8 => Byte, "byte";
    i16 => Short, "short";
    i32 => Int, "int";
    i64 => Long, "long";
    f32 => Float, "float";
    f64 => Double, "double";
    String => String, "string";
    Vec<Tag> => List, "list";
    Vec<i32> => IntArray, "int array";
    Vec<i64> => LongArray, "long array";
}

impl FromTag for bool {
    const EXPECTED: &'static str = "byte";

    fn from_tag(tag: &Tag) -> Option<Self> {
        tag.as_i8().map(|b| b != 0)
    }
}

impl From<bool> for Tag {
    fn from(value: bool) -> Self {
        Tag::Byte(value as i8)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_owned())
    }
}

impl FromTag for Tag {
    const EXPECTED: &'static str = "any";

    fn from_tag(tag: &Tag) -> Option<Self> {
        Some(tag.clone())
    }
}

fn read_length<R: Read>(reader: &mut R) -> Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    if length < 0 {
        return Err(NbtError::NegativeLength(length));
    }
    Ok(length as usize)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| NbtError::InvalidString)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u16::<BigEndian>(value.len() as u16)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

// NBTFile represents a complete NBT file with compression support
pub struct NBTFile {
    pub root: Tag,
    pub name: String,
}

impl NBTFile {
    pub fn new(name: String, root: Tag) -> Self {
        NBTFile { root, name }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let (name, root) = Tag::read(reader)?;
        Ok(NBTFile { root, name })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        Self::read(&mut decoder)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    #[test]
    fn test_tag_type_ids() {
        assert_eq!(Tag::End.get_type_id(), 0);
        assert_eq!(Tag::Byte(0).get_type_id(), 1);
        assert_eq!(Tag::Compound(HashMap::new()).get_type_id(), 10);
        assert_eq!(Tag::LongArray(vec![]).get_type_id(), 12);
    }

    #[test]
    fn test_tag_read_write() {
        let test_cases = vec![
            (Tag::Byte(42), "byte"),
            (Tag::Short(1234), "short"),
            (Tag::Int(12345678), "int"),
            (Tag::Long(123456789012), "long"),
            (Tag::Double(3.14159), "double"),
            (Tag::ByteArray(vec![1, -2, 3]), "bytearray"),
            (Tag::String("Hello, World!".to_string()), "string"),
            (
                Tag::List(vec![Tag::Int(1), Tag::Int(2), Tag::Int(3)]),
                "list",
            ),
            (Tag::IntArray(vec![1, 2, 3]), "intarray"),
            (Tag::LongArray(vec![1, 2, 3]), "longarray"),
        ];

        for (tag, name) in test_cases {
            let mut buffer = Vec::new();
            tag.write(&mut buffer, name).unwrap();

            let mut cursor = Cursor::new(buffer);
            let (read_name, read_tag) = Tag::read(&mut cursor).unwrap();

            assert_eq!(read_name, name);
            assert_eq!(read_tag, tag);
        }
    }

    #[test]
    fn test_nameless_root_omits_name() {
        let mut tag = Tag::compound();
        tag.set("text", "hi").unwrap();

        let mut named = Vec::new();
        tag.write(&mut named, "").unwrap();
        let mut nameless = Vec::new();
        tag.write_nameless(&mut nameless).unwrap();

        // an empty name still costs its two length bytes
        assert_eq!(named.len(), nameless.len() + 2);
        let read = Tag::read_nameless(&mut Cursor::new(nameless), DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(read, tag);
    }

    #[test]
    fn test_typed_get_and_set() {
        let mut tag = Tag::compound();
        assert_eq!(tag.set("width", 2i32).unwrap(), None);
        tag.set("asset_id", "minecraft:kebab").unwrap();
        tag.set("flag", true).unwrap();

        assert_eq!(tag.get_as::<i32>("width").unwrap(), 2);
        assert_eq!(tag.get_as::<String>("asset_id").unwrap(), "minecraft:kebab");
        assert!(tag.get_as::<bool>("flag").unwrap());
        assert_eq!(tag.get_opt::<i32>("height").unwrap(), None);

        assert_matches!(tag.get_as::<i32>("height"), Err(NbtError::MissingKey(key)) if key == "height");
        assert_matches!(
            tag.get_as::<i64>("width"),
            Err(NbtError::WrongType { expected: "long", found: "int", .. })
        );
        assert_matches!(Tag::Int(1).set("x", 1i32), Err(NbtError::NotCompound));
    }

    #[test]
    fn test_depth_limit() {
        let mut tag = Tag::Int(0);
        for _ in 0..8 {
            tag = Tag::List(vec![tag]);
        }
        let mut buffer = Vec::new();
        tag.write_nameless(&mut buffer).unwrap();

        let result = Tag::read_nameless(&mut Cursor::new(buffer.clone()), 4);
        assert_matches!(result, Err(NbtError::DepthExceeded(4)));
        assert!(Tag::read_nameless(&mut Cursor::new(buffer), 16).is_ok());
    }

    #[test]
    fn test_nbt_file() {
        let mut compound = HashMap::new();
        compound.insert("name".to_string(), Tag::String("Test".to_string()));
        compound.insert("value".to_string(), Tag::Int(42));

        let original = NBTFile::new("test".to_string(), Tag::Compound(compound));

        let mut gzip_buffer = Vec::new();
        original.write_gzip(&mut gzip_buffer).unwrap();

        let mut gzip_cursor = Cursor::new(gzip_buffer);
        let gzip_read = NBTFile::read_gzip(&mut gzip_cursor).unwrap();

        assert_eq!(gzip_read.name, original.name);
        assert_eq!(gzip_read.root, original.root);
    }

    #[test]
    fn test_invalid_tag_type() {
        let result = Tag::read_nameless(&mut Cursor::new(vec![255]), DEFAULT_MAX_DEPTH);
        assert_matches!(result, Err(NbtError::InvalidTagType(255)));
    }

    #[test]
    fn test_negative_length_rejected() {
        let bytes = vec![11, 0xFF, 0xFF, 0xFF, 0xFF];
        let result = Tag::read_nameless(&mut Cursor::new(bytes), DEFAULT_MAX_DEPTH);
        assert_matches!(result, Err(NbtError::NegativeLength(-1)));
    }

    #[test]
    fn test_list_of_end_tags_rejected() {
        // list of 100 million end tags in six bytes
        let bytes = vec![9, 0, 0x05, 0xF5, 0xE1, 0x00];
        let result = Tag::read_nameless(&mut Cursor::new(bytes), DEFAULT_MAX_DEPTH);
        assert_matches!(result, Err(NbtError::EndList(100_000_000)));

        let empty = vec![9, 0, 0, 0, 0, 0];
        let read = Tag::read_nameless(&mut Cursor::new(empty), DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(read, Tag::List(vec![]));
    }

    #[test]
    fn test_oversized_arrays_fail_on_missing_bytes() {
        // each declares i32::MAX elements but carries two bytes
        for type_id in [7, 11, 12] {
            let bytes = vec![type_id, 0x7F, 0xFF, 0xFF, 0xFF, 1, 2];
            let result = Tag::read_nameless(&mut Cursor::new(bytes), DEFAULT_MAX_DEPTH);
            assert_matches!(
                result,
                Err(NbtError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof
            );
        }
    }

    #[test]
    fn test_empty_list() {
        let tag = Tag::List(vec![]);
        let mut buffer = Vec::new();
        tag.write(&mut buffer, "empty").unwrap();

        let mut cursor = Cursor::new(buffer);
        let (name, read_tag) = Tag::read(&mut cursor).unwrap();

        assert_eq!(name, "empty");
        assert_eq!(read_tag, tag);
    }
}
