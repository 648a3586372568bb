use crate::mappings::MappingTable;
use crate::registry::VersionedRegistry;
use crate::wrapper::PacketWrapper;
use glider_common::{ProtocolError, Result};
use glider_nbt::Tag;
use once_cell::sync;

const DISPLAY_TYPE_MAPPINGS: &str = r#"{
    "V_1_21_6": ["default", "hidden", "override"]
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeDisplayType {
    Default,
    Hidden,
    Override,
}

fn build_display_types() -> Result<VersionedRegistry<AttributeDisplayType>> {
    let mappings = MappingTable::from_json(DISPLAY_TYPE_MAPPINGS)?;
    let mut registry = VersionedRegistry::with_mappings("attribute_display_type", mappings);
    registry.define("default", |_| AttributeDisplayType::Default)?;
    registry.define("hidden", |_| AttributeDisplayType::Hidden)?;
    registry.define("override", |_| AttributeDisplayType::Override)?;
    registry.freeze()?;
    Ok(registry)
}

pub static ATTRIBUTE_DISPLAY_TYPES: sync::Lazy<VersionedRegistry<AttributeDisplayType>> =
    sync::Lazy::new(|| build_display_types().expect("attribute display mappings are valid"));

impl AttributeDisplayType {
    pub fn name(self) -> &'static str {
        match self {
            AttributeDisplayType::Default => "default",
            AttributeDisplayType::Hidden => "hidden",
            AttributeDisplayType::Override => "override",
        }
    }
}

/// How an attribute modifier is shown in an item tooltip (1.21.6+).
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeDisplay {
    Default,
    Hidden,
    /// Replaces the generated line with a text component.
    Override(Tag),
}

impl AttributeDisplay {
    pub fn display_type(&self) -> AttributeDisplayType {
        match self {
            AttributeDisplay::Default => AttributeDisplayType::Default,
            AttributeDisplay::Hidden => AttributeDisplayType::Hidden,
            AttributeDisplay::Override(_) => AttributeDisplayType::Override,
        }
    }

    pub fn read(wrapper: &mut PacketWrapper) -> Result<Self> {
        let handle = wrapper.read_mapped_entity(&*ATTRIBUTE_DISPLAY_TYPES)?;
        match ATTRIBUTE_DISPLAY_TYPES.get(handle) {
            Some(AttributeDisplayType::Default) => Ok(AttributeDisplay::Default),
            Some(AttributeDisplayType::Hidden) => Ok(AttributeDisplay::Hidden),
            Some(AttributeDisplayType::Override) => Ok(AttributeDisplay::Override(wrapper.read_nbt()?)),
            None => Err(ProtocolError::invalid_data("dangling attribute display handle")),
        }
    }

    pub fn write(&self, wrapper: &mut PacketWrapper) -> Result<()> {
        let name = self.display_type().name();
        let handle = ATTRIBUTE_DISPLAY_TYPES.get_by_name(name).ok_or_else(|| {
            ProtocolError::invalid_data(format!("attribute display type {} is not registered", name))
        })?;
        wrapper.write_mapped_entity(&*ATTRIBUTE_DISPLAY_TYPES, handle)?;
        if let AttributeDisplay::Override(component) = self {
            wrapper.write_nbt(component)?;
        }
        Ok(())
    }
}
