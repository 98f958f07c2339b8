//! Filesystems behind the jail
//!
//! Provides an async filesystem trait and implementations:
//! - `InMemoryFs`: in-memory tree, the default and what tests use
//! - `HostFs`: a real host directory acting as the fake root

mod host;
mod memory;
mod traits;

pub use host::HostFs;
pub use memory::InMemoryFs;
pub use traits::{DirEntry, FileSystem, FileType, Metadata};
