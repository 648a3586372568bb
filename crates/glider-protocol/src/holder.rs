//! References to registry entries that may also be sent inline.

use crate::registry::{Handle, VersionedRegistry};
use glider_common::Identifier;

/// A registry entry, or an ad hoc value that was never registered.
///
/// On the wire a varint `0` announces an inline value; any other value is
/// the entry's network id plus one.
#[derive(Debug, Clone, PartialEq)]
pub enum Holder<T, D = T> {
    Reference(Handle<T>),
    Direct(D),
}

impl<T, D> Holder<T, D> {
    pub fn is_direct(&self) -> bool {
        matches!(self, Holder::Direct(_))
    }

    pub fn handle(&self) -> Option<Handle<T>> {
        match self {
            Holder::Reference(handle) => Some(*handle),
            Holder::Direct(_) => None,
        }
    }

    pub fn direct(&self) -> Option<&D> {
        match self {
            Holder::Reference(_) => None,
            Holder::Direct(value) => Some(value),
        }
    }
}

impl<T> Holder<T, T> {
    /// The held value, looked up in `registry` for references.
    pub fn value<'a>(&'a self, registry: &'a VersionedRegistry<T>) -> Option<&'a T> {
        match self {
            Holder::Reference(handle) => registry.get(*handle),
            Holder::Direct(value) => Some(value),
        }
    }
}

impl<T, D> From<Handle<T>> for Holder<T, D> {
    fn from(handle: Handle<T>) -> Self {
        Holder::Reference(handle)
    }
}

/// A set of registry entries: either a named tag or an explicit list.
///
/// Wire form: varint `0` followed by the tag identifier, or `count + 1`
/// followed by `count` network ids.
#[derive(Debug, Clone, PartialEq)]
pub enum HolderSet<T> {
    Tag(Identifier),
    Direct(Vec<Handle<T>>),
}

impl<T> HolderSet<T> {
    pub fn tag(&self) -> Option<&Identifier> {
        match self {
            HolderSet::Tag(tag) => Some(tag),
            HolderSet::Direct(_) => None,
        }
    }

    pub fn handles(&self) -> &[Handle<T>] {
        match self {
            HolderSet::Tag(_) => &[],
            HolderSet::Direct(handles) => handles,
        }
    }
}

/// An inline value, or just the name of a registry entry.
///
/// Wire form: a boolean, then the inline value when `true` or the entry's
/// identifier when `false`. Names are kept as sent; they are resolved
/// against a registry only when asked.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeMapped<D> {
    Direct(D),
    Named(Identifier),
}

impl<D> MaybeMapped<D> {
    /// Looks a named entry up by name. Inline values have no handle.
    pub fn resolve<T>(&self, registry: &VersionedRegistry<T>) -> Option<Handle<T>> {
        match self {
            MaybeMapped::Direct(_) => None,
            MaybeMapped::Named(name) => registry.get_by_name(&name.to_string()),
        }
    }
}
