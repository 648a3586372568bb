//! Painting variants, synced as a data-driven registry since 1.20.5.
//!
//! A painting on the wire is a [`Holder`]: either a reference into
//! [`PAINTING_VARIANTS`] or a variant sent inline.

use crate::holder::Holder;
use crate::mappings::MappingTable;
use crate::registry::VersionedRegistry;
use crate::wrapper::{NbtCodec, PacketWrapper};
use glider_common::{Identifier, ProtocolError, ProtocolVersion, Result};
use glider_nbt::Tag;
use once_cell::sync;

#[derive(Debug, Clone, PartialEq)]
pub struct PaintingVariant {
    /// Size in blocks
    pub width: i32,
    pub height: i32,
    pub asset_id: Identifier,
    /// Text components, 1.21.2+
    pub title: Option<Tag>,
    pub author: Option<Tag>,
}

pub type PaintingHolder = Holder<PaintingVariant>;

impl PaintingVariant {
    pub fn new(width: i32, height: i32, asset_id: impl Into<Identifier>) -> Self {
        Self {
            width,
            height,
            asset_id: asset_id.into(),
            title: None,
            author: None,
        }
    }

    fn has_text(version: ProtocolVersion) -> bool {
        version.is_newer_than_or_equals(ProtocolVersion::V_1_21_2)
    }

    pub fn read_direct(wrapper: &mut PacketWrapper) -> Result<Self> {
        let width = wrapper.read_varint()?;
        let height = wrapper.read_varint()?;
        let mut variant = Self::new(width, height, wrapper.read_identifier()?);
        if Self::has_text(wrapper.version()) {
            variant.title = wrapper.read_optional(|w| w.read_nbt())?;
            variant.author = wrapper.read_optional(|w| w.read_nbt())?;
        }
        Ok(variant)
    }

    pub fn write_direct(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        wrapper.write_varint(self.width);
        wrapper.write_varint(self.height);
        wrapper.write_identifier(&self.asset_id);
        if Self::has_text(wrapper.version()) {
            wrapper.write_optional(self.title.as_ref(), |w, title| w.write_nbt(title))?;
            wrapper.write_optional(self.author.as_ref(), |w, author| w.write_nbt(author))?;
        }
        Ok(())
    }

    pub fn read_holder(wrapper: &mut PacketWrapper) -> Result<PaintingHolder> {
        Self::read_holder_in(&PAINTING_VARIANTS, wrapper)
    }

    pub fn write_holder(holder: &PaintingHolder, wrapper: &mut PacketWrapper) -> Result<()> {
        Self::write_holder_in(&PAINTING_VARIANTS, holder, wrapper)
    }

    /// Reads a holder against `registry`, e.g. one synced by the server.
    pub fn read_holder_in(
        registry: &VersionedRegistry<PaintingVariant>,
        wrapper: &mut PacketWrapper,
    ) -> Result<PaintingHolder> {
        wrapper.read_mapped_entity_or_direct(registry, Self::read_direct)
    }

    pub fn write_holder_in(
        registry: &VersionedRegistry<PaintingVariant>,
        holder: &PaintingHolder,
        wrapper: &mut PacketWrapper,
    ) -> Result<()> {
        wrapper.write_mapped_entity_or_direct(registry, holder, |w, variant| variant.write_direct(w))
    }

    /// Reference to the vanilla variant `name`, if it is registered.
    pub fn vanilla(name: &str) -> Option<PaintingHolder> {
        PAINTING_VARIANTS.get_by_name(name).map(Holder::Reference)
    }
}

impl NbtCodec for PaintingVariant {
    fn decode_nbt(tag: &Tag, version: ProtocolVersion) -> Result<Self> {
        let asset_id: String = tag.get_as("asset_id")?;
        let mut variant = Self::new(
            tag.get_as("width")?,
            tag.get_as("height")?,
            Identifier::parse(&asset_id),
        );
        if Self::has_text(version) {
            variant.title = tag.get_opt("title")?;
            variant.author = tag.get_opt("author")?;
        }
        Ok(variant)
    }

    fn encode_nbt(&self, version: ProtocolVersion) -> Result<Tag> {
        let mut tag = Tag::compound();
        tag.set("width", self.width)?;
        tag.set("height", self.height)?;
        tag.set("asset_id", self.asset_id.to_string())?;
        if Self::has_text(version) {
            if let Some(title) = &self.title {
                tag.set("title", title.clone())?;
            }
            if let Some(author) = &self.author {
                tag.set("author", author.clone())?;
            }
        }
        Ok(tag)
    }
}

/// Vanilla variants and their size, in registry order where they were added.
const VANILLA_1_20_5: &[(&str, i32, i32)] = &[
    ("alban", 1, 1),
    ("aztec", 1, 1),
    ("aztec2", 1, 1),
    ("bomb", 1, 1),
    ("burning_skull", 4, 4),
    ("bust", 2, 2),
    ("courbet", 2, 1),
    ("creebet", 2, 1),
    ("donkey_kong", 4, 3),
    ("earth", 2, 2),
    ("fighters", 4, 2),
    ("fire", 2, 2),
    ("graham", 1, 2),
    ("kebab", 1, 1),
    ("match", 2, 2),
    ("pigscene", 4, 4),
    ("plant", 1, 1),
    ("pointer", 4, 4),
    ("pool", 2, 1),
    ("sea", 2, 1),
    ("skeleton", 4, 3),
    ("skull_and_roses", 2, 2),
    ("stage", 2, 2),
    ("sunset", 2, 1),
    ("void", 2, 2),
    ("wanderer", 1, 2),
    ("wasteland", 1, 1),
    ("water", 2, 2),
    ("wind", 2, 2),
    ("wither", 2, 2),
];

const ADDED_1_21: &[(&str, i32, i32)] = &[
    ("backyard", 3, 4),
    ("baroque", 2, 2),
    ("bouquet", 3, 3),
    ("cavebird", 3, 3),
    ("changing", 4, 2),
    ("cotan", 3, 3),
    ("endboss", 3, 3),
    ("fern", 3, 3),
    ("finding", 4, 2),
    ("humble", 2, 2),
    ("lowmist", 4, 2),
    ("meditative", 1, 1),
    ("orb", 4, 4),
    ("owlemons", 3, 3),
    ("passage", 4, 2),
    ("pond", 3, 4),
    ("prairie_ride", 1, 2),
    ("sunflowers", 3, 3),
    ("tides", 3, 3),
    ("unpacked", 4, 4),
];

/// Vanilla syncs the registry sorted by name.
fn sorted_names<'a>(variants: impl Iterator<Item = &'a (&'a str, i32, i32)>) -> Vec<Identifier> {
    let mut names: Vec<&str> = variants.map(|(name, _, _)| *name).collect();
    names.sort_unstable();
    names.into_iter().map(Identifier::minecraft).collect()
}

fn build_painting_variants() -> Result<VersionedRegistry<PaintingVariant>> {
    let mut mappings = MappingTable::new();
    mappings.insert(ProtocolVersion::V_1_20_5, sorted_names(VANILLA_1_20_5.iter()))?;
    mappings.insert(
        ProtocolVersion::V_1_21,
        sorted_names(VANILLA_1_20_5.iter().chain(ADDED_1_21)),
    )?;

    let mut registry = VersionedRegistry::with_mappings("painting_variant", mappings);
    for (name, width, height) in VANILLA_1_20_5.iter().chain(ADDED_1_21) {
        registry.define(*name, |id| PaintingVariant::new(*width, *height, id.clone()))?;
    }
    registry.freeze()?;
    Ok(registry)
}

pub static PAINTING_VARIANTS: sync::Lazy<VersionedRegistry<PaintingVariant>> =
    sync::Lazy::new(|| build_painting_variants().expect("painting variant table is consistent"));

/// Item component carrying the variant of a painting item, 1.20.5+
#[derive(Debug, Clone, PartialEq)]
pub struct PaintingVariantComponent {
    pub variant: PaintingHolder,
}

impl PaintingVariantComponent {
    pub fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        if wrapper.version().is_older_than(ProtocolVersion::V_1_20_5) {
            return Err(ProtocolError::invalid_data(format!(
                "painting variant component does not exist in {}",
                wrapper.version()
            )));
        }
        Ok(Self {
            variant: PaintingVariant::read_holder(wrapper)?,
        })
    }

    pub fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        PaintingVariant::write_holder(&self.variant, wrapper)
    }
}
