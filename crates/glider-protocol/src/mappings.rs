//! Mapping tables: which names exist, in wire-id order, for each version.
//!
//! A table lists, for every protocol version at which the id assignment
//! changed, the complete id-ordered list of names valid from that version on.
//! A name's network id is its position in the list. Tables are bootstrap data:
//! a registry derives its bindings from one and drops it when frozen.

use glider_common::{Identifier, ProtocolError, ProtocolVersion, Result};
use glider_nbt::{NBTFile, Tag};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    // ascending by version
    versions: Vec<(ProtocolVersion, Vec<Identifier>)>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the id-ordered name list that applies from `version` on.
    pub fn insert(&mut self, version: ProtocolVersion, names: Vec<Identifier>) -> Result<()> {
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name) {
                return Err(ProtocolError::Mapping(format!(
                    "'{}' listed twice for {}",
                    name, version
                )));
            }
        }
        match self.versions.binary_search_by_key(&version, |(v, _)| *v) {
            Ok(_) => Err(ProtocolError::Mapping(format!(
                "version {} listed twice",
                version
            ))),
            Err(pos) => {
                self.versions.insert(pos, (version, names));
                Ok(())
            }
        }
    }

    /// Parses `{"V_1_20_5": ["kebab", "aztec"], "V_1_21": [...]}`.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(content)
            .map_err(|e| ProtocolError::Mapping(format!("Failed to parse mappings: {e}")))?;

        let mut table = MappingTable::new();
        for (key, names) in raw {
            let version = parse_version(&key)?;
            table.insert(version, names.into_iter().map(Identifier::from).collect())?;
        }
        debug!(versions = table.versions.len(), "loaded JSON mapping table");
        Ok(table)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ProtocolError::Mapping(format!("Failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&content)
    }

    /// Reads a compound of version keys to lists of string tags.
    pub fn from_nbt(root: &Tag) -> Result<Self> {
        let compound = root
            .as_compound()
            .ok_or_else(|| ProtocolError::Mapping("mapping root is not a compound".to_string()))?;

        let mut table = MappingTable::new();
        for (key, value) in compound {
            let version = parse_version(key)?;
            let list = value.as_list().ok_or_else(|| {
                ProtocolError::Mapping(format!("entry for {} is not a list", key))
            })?;
            let names = list
                .iter()
                .map(|tag| {
                    tag.as_string().map(|s| Identifier::parse(s)).ok_or_else(|| {
                        ProtocolError::Mapping(format!("non-string name under {}", key))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            table.insert(version, names)?;
        }
        Ok(table)
    }

    /// Reads the gzipped NBT form written by [`MappingTable::to_nbt`].
    pub fn from_gzip_nbt<R: Read>(reader: &mut R) -> Result<Self> {
        let file = NBTFile::read_gzip(reader)?;
        let table = Self::from_nbt(&file.root)?;
        debug!(versions = table.versions.len(), "loaded NBT mapping table");
        Ok(table)
    }

    pub fn to_nbt(&self) -> Tag {
        let mut root = Tag::compound();
        if let Tag::Compound(map) = &mut root {
            for (version, names) in &self.versions {
                let list = names.iter().map(|n| Tag::String(n.to_string())).collect();
                map.insert(version_key(*version), Tag::List(list));
            }
        }
        root
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn versions(&self) -> impl Iterator<Item = ProtocolVersion> + '_ {
        self.versions.iter().map(|(v, _)| *v)
    }

    /// The name list in effect at `version`.
    pub fn names_at(&self, version: ProtocolVersion) -> Option<&[Identifier]> {
        let pos = self.versions.partition_point(|(v, _)| *v <= version);
        if pos == 0 {
            return None;
        }
        Some(&self.versions[pos - 1].1)
    }

    /// Every change in `name`'s network id, oldest first. `None` means the
    /// name stops existing from that version on.
    pub fn bindings_for(&self, name: &Identifier) -> Vec<(ProtocolVersion, Option<i32>)> {
        let mut bindings = Vec::new();
        let mut current = None;
        for (version, names) in &self.versions {
            let id = names.iter().position(|n| n == name).map(|i| i as i32);
            if id != current {
                bindings.push((*version, id));
                current = id;
            }
        }
        bindings
    }
}

fn parse_version(key: &str) -> Result<ProtocolVersion> {
    key.parse::<ProtocolVersion>().map_err(ProtocolError::Mapping)
}

fn version_key(version: ProtocolVersion) -> String {
    ProtocolVersion::KNOWN
        .iter()
        .find(|(v, _, _)| *v == version)
        .map(|(_, _, constant)| constant.to_string())
        .unwrap_or_else(|| version.protocol().to_string())
}
