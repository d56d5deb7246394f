//! Backend configuration: descriptors, the configuration-source contract,
//! and the volatile/file-backed source implementations.

mod descriptor;
mod file_source;
mod source;

pub use descriptor::{StoreDescriptor, StoreLocation};
pub use file_source::FileConfigSource;
pub use source::{ConfigListener, ConfigSource, MemoryConfigSource};
