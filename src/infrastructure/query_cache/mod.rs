//! Cache store implementations

mod file;
mod in_memory;
mod table;

pub use file::FileCacheStore;
pub use in_memory::InMemoryCacheStore;
