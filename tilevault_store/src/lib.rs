//! The tilevault storage engine: a multi-backend, hot-swappable router for
//! tile persistence.
//!
//! Tiles are addressed by layer, grid set, format, parameter digest and
//! coordinate ([`tilevault_core::TileKey`]) and routed to one of several
//! configurable backends implementing the [`TileStore`] contract. The
//! [`StoreRegistry`] merges backend descriptors from pluggable
//! configuration sources, the [`StoreRouter`] keeps the id → live-store
//! mapping reconfigurable without downtime, and the [`TileBroker`] is the
//! single entry point the surrounding application talks to.

mod broker;
pub mod config;
mod errors;
mod registry;
mod router;
pub mod store;

pub use broker::TileBroker;
pub use config::{ConfigListener, ConfigSource, FileConfigSource, MemoryConfigSource, StoreDescriptor, StoreLocation};
pub use errors::{ConfigError, StoreError};
pub use registry::StoreRegistry;
pub use router::{DEFAULT_SLOT_ID, LayerLookup, StoreRouter, SuitabilityPolicy};
pub use store::{DefaultStoreFactory, FileStore, MemoryStore, StorageState, StoreFactory, TileEvent, TileListener, TileStore};
