//! Versioned registries.
//!
//! A registry maps stable names to per-version network ids. It is built in two
//! phases: `define`/`bind_version` calls during bootstrap, then `freeze`, which
//! builds the reverse index and drops bootstrap-only data. A frozen registry is
//! read-only and can be shared across threads without locking.

use crate::mappings::MappingTable;
use glider_common::{Identifier, ProtocolError, ProtocolVersion, Result};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use tracing::debug;

/// Stable reference to one entry of a `VersionedRegistry<T>`.
pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    /// Position of the entry in definition order.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    from: ProtocolVersion,
    // None once retired
    id: Option<i32>,
}

#[derive(Debug)]
struct Entry<T> {
    name: Identifier,
    value: T,
    bindings: Vec<Binding>,
}

impl<T> Entry<T> {
    fn network_id(&self, version: ProtocolVersion) -> Option<i32> {
        let pos = self.bindings.partition_point(|b| b.from <= version);
        if pos == 0 {
            return None;
        }
        self.bindings[pos - 1].id
    }
}

/// Stretch of versions over which no binding changes.
#[derive(Debug)]
struct Segment {
    from: ProtocolVersion,
    ids: IdIndex,
}

/// Network id to entry index for one segment.
#[derive(Debug)]
enum IdIndex {
    // indexed by network id
    Dense(Vec<Option<u32>>),
    Sparse(HashMap<i32, u32>),
}

impl IdIndex {
    /// A dense table holds at most this many slots per bound id.
    const MAX_SLOTS_PER_ID: usize = 4;

    fn build(ids: HashMap<i32, u32>) -> Self {
        let Some(&max_id) = ids.keys().max() else {
            return IdIndex::Dense(Vec::new());
        };
        let slots = max_id as usize + 1;
        if slots > ids.len().saturating_mul(Self::MAX_SLOTS_PER_ID).max(64) {
            return IdIndex::Sparse(ids);
        }
        let mut table = vec![None; slots];
        for (id, index) in ids {
            table[id as usize] = Some(index);
        }
        IdIndex::Dense(table)
    }

    fn get(&self, network_id: i32) -> Option<u32> {
        match self {
            IdIndex::Dense(table) => usize::try_from(network_id)
                .ok()
                .and_then(|id| table.get(id).copied().flatten()),
            IdIndex::Sparse(map) => map.get(&network_id).copied(),
        }
    }
}

#[derive(Debug)]
pub struct VersionedRegistry<T> {
    key: Identifier,
    entries: Vec<Entry<T>>,
    by_name: HashMap<Identifier, u32>,
    mappings: Option<MappingTable>,
    segments: Option<Vec<Segment>>,
}

impl<T> VersionedRegistry<T> {
    pub fn new(key: impl Into<Identifier>) -> Self {
        Self {
            key: key.into(),
            entries: Vec::new(),
            by_name: HashMap::new(),
            mappings: None,
            segments: None,
        }
    }

    /// Creates a registry whose entries take their bindings from `mappings`.
    pub fn with_mappings(key: impl Into<Identifier>, mappings: MappingTable) -> Self {
        Self {
            mappings: Some(mappings),
            ..Self::new(key)
        }
    }

    pub fn key(&self) -> &Identifier {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.segments.is_some()
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(ProtocolError::RegistryFrozen {
                registry: self.key.clone(),
            });
        }
        Ok(())
    }

    fn entry(&self, handle: Handle<T>) -> Result<&Entry<T>> {
        self.entries.get(handle.index()).ok_or_else(|| {
            ProtocolError::invalid_data(format!(
                "{:?} does not belong to registry '{}'",
                handle, self.key
            ))
        })
    }

    /// Registers a new entry. `factory` receives the normalised name.
    ///
    /// When the registry was created with a mapping table, the entry's
    /// bindings are taken from it.
    pub fn define<F>(&mut self, name: impl Into<Identifier>, factory: F) -> Result<Handle<T>>
    where
        F: FnOnce(&Identifier) -> T,
    {
        self.ensure_mutable()?;
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ProtocolError::DuplicateDefinition {
                registry: self.key.clone(),
                name,
            });
        }

        let bindings = match &self.mappings {
            Some(mappings) => {
                let bindings: Vec<Binding> = mappings
                    .bindings_for(&name)
                    .into_iter()
                    .map(|(from, id)| Binding { from, id })
                    .collect();
                if bindings.is_empty() {
                    debug!(registry = %self.key, %name, "entry not present in mappings");
                }
                bindings
            }
            None => Vec::new(),
        };

        let handle = Handle::new(self.entries.len());
        let value = factory(&name);
        self.by_name.insert(name.clone(), handle.index);
        self.entries.push(Entry {
            name,
            value,
            bindings,
        });
        Ok(handle)
    }

    /// Declares that from `from` on, `handle` is sent as `network_id`.
    pub fn bind_version(
        &mut self,
        handle: Handle<T>,
        from: ProtocolVersion,
        network_id: i32,
    ) -> Result<()> {
        if network_id < 0 {
            return Err(ProtocolError::invalid_data(format!(
                "negative network id {}",
                network_id
            )));
        }
        self.push_binding(handle, from, Some(network_id))
    }

    /// Closes the current binding range: from `from` on, `handle` has no id.
    pub fn retire(&mut self, handle: Handle<T>, from: ProtocolVersion) -> Result<()> {
        self.push_binding(handle, from, None)
    }

    fn push_binding(
        &mut self,
        handle: Handle<T>,
        from: ProtocolVersion,
        id: Option<i32>,
    ) -> Result<()> {
        self.ensure_mutable()?;
        let key = self.key.clone();
        let entry = self
            .entries
            .get_mut(handle.index())
            .ok_or_else(|| ProtocolError::invalid_data(format!("{:?} is out of range", handle)))?;

        if let Some(last) = entry.bindings.last() {
            if from <= last.from {
                return Err(ProtocolError::InvalidBindingOrder {
                    registry: key,
                    name: entry.name.clone(),
                    previous: last.from,
                    attempted: from,
                });
            }
        }
        entry.bindings.push(Binding { from, id });
        Ok(())
    }

    /// Builds the reverse index and drops bootstrap data. Idempotent.
    ///
    /// Fails with `WireIdCollision` if two entries claim the same network id
    /// at any version; the registry then stays unfrozen.
    pub fn freeze(&mut self) -> Result<()> {
        if self.is_frozen() {
            return Ok(());
        }

        let mut boundaries: Vec<ProtocolVersion> = self
            .entries
            .iter()
            .flat_map(|e| e.bindings.iter().map(|b| b.from))
            .collect();
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut segments = Vec::with_capacity(boundaries.len());
        for version in boundaries {
            let mut ids: HashMap<i32, u32> = HashMap::new();
            for (index, entry) in self.entries.iter().enumerate() {
                let Some(id) = entry.network_id(version) else {
                    continue;
                };
                if let Some(first) = ids.insert(id, index as u32) {
                    return Err(ProtocolError::WireIdCollision {
                        registry: self.key.clone(),
                        version,
                        id,
                        first: self.entries[first as usize].name.clone(),
                        second: entry.name.clone(),
                    });
                }
            }
            segments.push(Segment {
                from: version,
                ids: IdIndex::build(ids),
            });
        }

        self.mappings = None;
        self.entries.shrink_to_fit();
        self.by_name.shrink_to_fit();
        debug!(
            registry = %self.key,
            entries = self.entries.len(),
            segments = segments.len(),
            "registry frozen"
        );
        self.segments = Some(segments);
        Ok(())
    }

    /// Finds the entry sent as `network_id` at `version`.
    pub fn resolve_by_network_id(
        &self,
        version: ProtocolVersion,
        network_id: i32,
    ) -> Result<Handle<T>> {
        let segments = self
            .segments
            .as_ref()
            .ok_or_else(|| ProtocolError::RegistryNotFrozen {
                registry: self.key.clone(),
            })?;

        let pos = segments.partition_point(|s| s.from <= version);
        let found = pos
            .checked_sub(1)
            .and_then(|i| segments[i].ids.get(network_id));

        found.map(|index| Handle::new(index as usize)).ok_or_else(|| {
            ProtocolError::UnknownMapping {
                registry: self.key.clone(),
                version,
                id: network_id,
            }
        })
    }

    /// The network id `handle` is sent as at `version`.
    pub fn resolve_network_id(&self, handle: Handle<T>, version: ProtocolVersion) -> Result<i32> {
        let entry = self.entry(handle)?;
        entry
            .network_id(version)
            .ok_or_else(|| ProtocolError::UnmappedForVersion {
                registry: self.key.clone(),
                name: entry.name.clone(),
                version,
            })
    }

    /// Resolves a network id straight to the entry's value.
    pub fn value_by_network_id(&self, version: ProtocolVersion, network_id: i32) -> Result<&T> {
        let handle = self.resolve_by_network_id(version, network_id)?;
        Ok(&self.entry(handle)?.value)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.entries.get(handle.index()).map(|e| &e.value)
    }

    pub fn name(&self, handle: Handle<T>) -> Option<&Identifier> {
        self.entries.get(handle.index()).map(|e| &e.name)
    }

    /// Looks up an entry by name; a bare name means the `minecraft` namespace.
    pub fn get_by_name(&self, name: &str) -> Option<Handle<T>> {
        self.by_name
            .get(&Identifier::parse(name))
            .map(|index| Handle::new(*index as usize))
    }

    pub fn get_by_identifier(&self, name: &Identifier) -> Option<Handle<T>> {
        self.by_name
            .get(name)
            .map(|index| Handle::new(*index as usize))
    }

    /// Entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &Identifier, &T)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Handle::new(i), &e.name, &e.value))
    }

    /// Whether `handle` has a network id at `version`.
    pub fn is_present(&self, handle: Handle<T>, version: ProtocolVersion) -> bool {
        self.entries
            .get(handle.index())
            .and_then(|e| e.network_id(version))
            .is_some()
    }
}
