pub mod config;
pub mod error;
pub mod types;
pub mod version;

pub use config::CodecLimits;
pub use error::{ProtocolError, Severity};
pub use types::{BlockPosition, Direction, Identifier, Result};
pub use version::ProtocolVersion;
