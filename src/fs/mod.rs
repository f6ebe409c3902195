//! File System Module
//!
//! Virtual file system abstractions for the sandboxed shell.
//! - `InMemoryFs`: pure in-memory backing store (default)
//! - `BoundedFs`: wraps any `FileSystem` and rejects paths outside a root

pub mod bounded;
pub mod in_memory_fs;
pub mod types;

pub use bounded::BoundedFs;
pub use in_memory_fs::InMemoryFs;
pub use types::*;
