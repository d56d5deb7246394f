//! The backend contract and the reference backends.

mod factory;
mod file;
mod memory;
mod traits;

pub use factory::{DefaultStoreFactory, StoreFactory};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{StorageState, TileEvent, TileListener, TileStore};
