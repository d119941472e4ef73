//! [`KeyValueStore`](nishiki_common::auth::KeyValueStore) adapters
//!
//! - [`MemoryStore`]: process-local map, for headless runs and tests
//! - [`FileStore`]: JSON object on disk, survives restarts

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
