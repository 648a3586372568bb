use crate::types::Identifier;
use crate::version::ProtocolVersion;
use glider_nbt::NbtError;
use std::io;
use thiserror::Error;

/// How far a failure reaches. The connection layer uses this to decide
/// between dropping one packet and closing the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The current frame is unusable; the connection may continue.
    Frame,
    /// Corrupt or hostile input; the connection should be closed.
    Connection,
    /// A lookup found nothing for this version; callers fall back or skip.
    Recoverable,
    /// Programmer error while bootstrapping registries.
    Bootstrap,
    /// The cancellation signal: drop this packet and carry on.
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("buffer underrun: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun { needed: usize, remaining: usize },

    #[error("malformed varint: no terminator within {max_bytes} bytes")]
    MalformedVarInt { max_bytes: usize },

    #[error("string of length {length} exceeds maximum {max}")]
    StringTooLong { length: usize, max: usize },

    #[error("array of length {length} exceeds maximum {max}")]
    ArrayTooLong { length: usize, max: usize },

    #[error("no entry in '{registry}' for network id {id} at {version}")]
    UnknownMapping {
        registry: Identifier,
        version: ProtocolVersion,
        id: i32,
    },

    #[error("'{name}' in '{registry}' has no network id at {version}")]
    UnmappedForVersion {
        registry: Identifier,
        name: Identifier,
        version: ProtocolVersion,
    },

    #[error("registry '{registry}' is frozen")]
    RegistryFrozen { registry: Identifier },

    #[error("registry '{registry}' has not been frozen")]
    RegistryNotFrozen { registry: Identifier },

    #[error("binding for '{name}' in '{registry}' at {attempted} does not follow {previous}")]
    InvalidBindingOrder {
        registry: Identifier,
        name: Identifier,
        previous: ProtocolVersion,
        attempted: ProtocolVersion,
    },

    #[error("'{name}' is already defined in '{registry}'")]
    DuplicateDefinition {
        registry: Identifier,
        name: Identifier,
    },

    #[error("'{first}' and '{second}' both claim network id {id} in '{registry}' at {version}")]
    WireIdCollision {
        registry: Identifier,
        version: ProtocolVersion,
        id: i32,
        first: Identifier,
        second: Identifier,
    },

    #[error("packet processing cancelled")]
    Cancelled,

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("mapping error: {0}")]
    Mapping(String),
}

impl ProtocolError {
    pub fn severity(&self) -> Severity {
        match self {
            ProtocolError::BufferUnderrun { .. }
            | ProtocolError::StringTooLong { .. }
            | ProtocolError::ArrayTooLong { .. }
            | ProtocolError::InvalidData(_)
            | ProtocolError::Nbt(_) => Severity::Frame,
            ProtocolError::MalformedVarInt { .. } | ProtocolError::Io(_) => Severity::Connection,
            ProtocolError::UnknownMapping { .. } | ProtocolError::UnmappedForVersion { .. } => {
                Severity::Recoverable
            }
            ProtocolError::RegistryFrozen { .. }
            | ProtocolError::RegistryNotFrozen { .. }
            | ProtocolError::InvalidBindingOrder { .. }
            | ProtocolError::DuplicateDefinition { .. }
            | ProtocolError::WireIdCollision { .. }
            | ProtocolError::Config(_)
            | ProtocolError::Mapping(_) => Severity::Bootstrap,
            ProtocolError::Cancelled => Severity::Cancelled,
        }
    }

    /// True for errors that only affect the current packet or field.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.severity(), Severity::Recoverable | Severity::Cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProtocolError::Cancelled)
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        ProtocolError::InvalidData(msg.into())
    }
}
