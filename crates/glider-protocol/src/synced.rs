//! Registries the server sends per connection.
//!
//! From 1.20.5 each data-driven registry arrives in its own registry data
//! packet: the registry key, then every element in network id order with
//! optional NBT data. An element without data refers to the vanilla entry of
//! the same name, which the client already knows from a shared data pack.
//! Before that, 1.20.2 to 1.20.4 send all registries in one NBT codec.

use crate::registry::VersionedRegistry;
use crate::wrapper::{NbtCodec, PacketWrapper};
use glider_common::{Identifier, ProtocolError, ProtocolVersion, Result};
use glider_nbt::Tag;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryElement {
    pub id: Identifier,
    pub data: Option<Tag>,
}

impl RegistryElement {
    pub fn new(id: impl Into<Identifier>, data: Option<Tag>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Body of the configuration-phase registry data packet.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryData {
    pub registry: Identifier,
    /// Position is the network id.
    pub elements: Vec<RegistryElement>,
}

impl RegistryData {
    pub fn new(registry: impl Into<Identifier>, elements: Vec<RegistryElement>) -> Self {
        Self {
            registry: registry.into(),
            elements,
        }
    }

    fn ensure_per_registry(version: ProtocolVersion) -> Result<()> {
        if version.is_older_than(ProtocolVersion::V_1_20_5) {
            return Err(ProtocolError::invalid_data(format!(
                "registries are not sent one at a time in {}",
                version
            )));
        }
        Ok(())
    }

    pub fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        Self::ensure_per_registry(wrapper.version())?;
        let registry = wrapper.read_identifier()?;
        let elements = wrapper.read_array(|w| {
            let id = w.read_identifier()?;
            let data = w.read_optional(|w| w.read_nbt())?;
            Ok(RegistryElement { id, data })
        })?;
        Ok(Self { registry, elements })
    }

    pub fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        Self::ensure_per_registry(wrapper.version())?;
        wrapper.write_identifier(&self.registry);
        wrapper.write_array(&self.elements, |w, element| {
            w.write_identifier(&element.id);
            w.write_optional(element.data.as_ref(), |w, data| w.write_nbt(data))
        })
    }

    /// Extracts one registry from a 1.20.2 to 1.20.4 registry codec, where
    /// every element carries its data and an explicit id.
    pub fn from_codec(codec: &Tag, registry: impl Into<Identifier>) -> Result<Self> {
        let registry = registry.into();
        let entry = codec.get(&registry.to_string()).ok_or_else(|| {
            ProtocolError::invalid_data(format!("codec has no registry '{}'", registry))
        })?;
        let values: Vec<Tag> = entry.get_as("value")?;

        let mut numbered = Vec::with_capacity(values.len());
        for value in &values {
            let name: String = value.get_as("name")?;
            let id: i32 = value.get_as("id")?;
            let element: Tag = value.get_as("element")?;
            numbered.push((id, RegistryElement::new(Identifier::parse(&name), Some(element))));
        }
        numbered.sort_by_key(|(id, _)| *id);
        for (position, (id, element)) in numbered.iter().enumerate() {
            if *id != position as i32 {
                return Err(ProtocolError::invalid_data(format!(
                    "'{}' in '{}' has id {}, expected {}",
                    element.id, registry, id, position
                )));
            }
        }

        Ok(Self {
            registry,
            elements: numbered.into_iter().map(|(_, element)| element).collect(),
        })
    }

    /// Builds the registry a connection at `version` uses in place of `base`.
    ///
    /// Elements with data are decoded; the rest reuse the `base` value of the
    /// same name. Elements found in neither leave their id unbound. The result
    /// binds every id from `version` on and is frozen.
    pub fn build<T>(
        &self,
        base: &VersionedRegistry<T>,
        version: ProtocolVersion,
    ) -> Result<VersionedRegistry<T>>
    where
        T: NbtCodec + Clone,
    {
        let mut registry = VersionedRegistry::new(base.key().clone());
        for (id, element) in self.elements.iter().enumerate() {
            let value = match &element.data {
                Some(data) => T::decode_nbt(data, version)?,
                None => match base.get_by_identifier(&element.id).and_then(|h| base.get(h)) {
                    Some(value) => value.clone(),
                    None => {
                        warn!(registry = %self.registry, element = %element.id, "unknown registry element");
                        continue;
                    }
                },
            };
            let handle = registry.define(element.id.clone(), |_| value)?;
            registry.bind_version(handle, version, id as i32)?;
        }
        registry.freeze()?;
        debug!(registry = %self.registry, %version, entries = registry.len(), "registry synced");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PaintingVariant, PAINTING_VARIANTS};
    use assert_matches::assert_matches;
    use glider_common::Direction;

    fn custom_variant() -> Tag {
        PaintingVariant::new(3, 2, "custom:sunrise")
            .encode_nbt(ProtocolVersion::V_1_21)
            .unwrap()
    }

    fn sample() -> RegistryData {
        RegistryData::new(
            "painting_variant",
            vec![
                RegistryElement::new("custom:sunrise", Some(custom_variant())),
                RegistryElement::new(Identifier::minecraft("kebab"), None),
                RegistryElement::new("custom:lost", None),
                RegistryElement::new(Identifier::minecraft("orb"), None),
            ],
        )
    }

    #[test]
    fn test_packet_body() {
        let data = sample();
        let mut wrapper = PacketWrapper::writer(ProtocolVersion::V_1_21, Direction::Clientbound);
        data.write(&mut wrapper).unwrap();
        let mut reader = PacketWrapper::reader(
            wrapper.into_buffer(),
            ProtocolVersion::V_1_21,
            Direction::Clientbound,
        );
        assert_eq!(RegistryData::read(&mut reader).unwrap(), data);
        assert!(!reader.is_readable());

        let mut old = PacketWrapper::writer(ProtocolVersion::V_1_20_3, Direction::Clientbound);
        assert_matches!(data.write(&mut old), Err(ProtocolError::InvalidData(_)));
    }

    #[test]
    fn test_build_overrides_vanilla_ids() {
        let synced = sample().build(&*PAINTING_VARIANTS, ProtocolVersion::V_1_21).unwrap();
        assert_eq!(synced.len(), 3);
        assert_eq!(synced.key(), PAINTING_VARIANTS.key());

        let sunrise = synced
            .value_by_network_id(ProtocolVersion::V_1_21, 0)
            .unwrap();
        assert_eq!((sunrise.width, sunrise.height), (3, 2));

        let kebab = synced.get_by_name("kebab").unwrap();
        assert_eq!(synced.resolve_network_id(kebab, ProtocolVersion::V_1_21).unwrap(), 1);
        assert_eq!(synced.get(kebab).unwrap().asset_id, Identifier::minecraft("kebab"));

        // the unknown element keeps its slot empty
        assert_matches!(
            synced.resolve_by_network_id(ProtocolVersion::V_1_21, 2),
            Err(ProtocolError::UnknownMapping { id: 2, .. })
        );
        let orb = synced.get_by_name("orb").unwrap();
        assert_eq!(synced.resolve_network_id(orb, ProtocolVersion::V_1_21).unwrap(), 3);
    }

    #[test]
    fn test_legacy_codec() {
        let mut element = Tag::compound();
        element.set("name", "minecraft:kebab").unwrap();
        element.set("id", 1i32).unwrap();
        let kebab = PaintingVariant::new(1, 1, "kebab")
            .encode_nbt(ProtocolVersion::V_1_20_3)
            .unwrap();
        element.set("element", kebab).unwrap();
        let mut first = Tag::compound();
        first.set("name", "custom:sunrise").unwrap();
        first.set("id", 0i32).unwrap();
        first.set("element", custom_variant()).unwrap();

        let mut registry = Tag::compound();
        registry.set("type", "minecraft:painting_variant").unwrap();
        registry.set("value", vec![element, first]).unwrap();
        let mut codec = Tag::compound();
        codec.set("minecraft:painting_variant", registry.clone()).unwrap();

        let data = RegistryData::from_codec(&codec, Identifier::minecraft("painting_variant")).unwrap();
        let names: Vec<String> = data.elements.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(names, ["custom:sunrise", "minecraft:kebab"]);

        assert!(RegistryData::from_codec(&codec, Identifier::minecraft("wolf_variant")).is_err());

        // ids with a gap cannot be laid out by position
        let mut values: Vec<Tag> = registry.get_as("value").unwrap();
        values[0].set("id", 5i32).unwrap();
        registry.set("value", values).unwrap();
        codec.set("minecraft:painting_variant", registry).unwrap();
        assert_matches!(
            RegistryData::from_codec(&codec, Identifier::minecraft("painting_variant")),
            Err(ProtocolError::InvalidData(_))
        );
    }
}
