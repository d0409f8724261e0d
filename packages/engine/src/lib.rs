//! Storage engines for pathbridge.
//!
//! Two engines ship with the bridge:
//! - [`MemoryEngine`]: process-local, lost on drop
//! - [`LocalDiskEngine`]: one JSON record file per resource directory
//!
//! Both share the record-level command semantics in [`record_ops`].

mod in_memory;
mod local_disk;
pub mod record_ops;

pub use in_memory::MemoryEngine;
pub use local_disk::LocalDiskEngine;
