//! Infrastructure Layer

pub mod file;
pub mod memory;

pub use file::JsonFileSecurityStore;
pub use memory::MemorySecurityStore;
