//! Turning descriptors into live store instances.

use crate::{
	StoreError,
	config::{StoreDescriptor, StoreLocation},
	store::{FileStore, MemoryStore, TileStore},
};
use std::sync::Arc;

/// Builds a live [`TileStore`] from its configuration record. The router
/// goes through a factory for every instantiation, so tests can substitute
/// instrumented stores.
pub trait StoreFactory: Send + Sync {
	fn create(&self, descriptor: &StoreDescriptor) -> Result<Arc<dyn TileStore>, StoreError>;
}

/// The standard factory covering every [`StoreLocation`] variant.
#[derive(Default)]
pub struct DefaultStoreFactory;

impl StoreFactory for DefaultStoreFactory {
	fn create(&self, descriptor: &StoreDescriptor) -> Result<Arc<dyn TileStore>, StoreError> {
		log::debug!("instantiating tile store {:?}", descriptor.id);
		match &descriptor.location {
			StoreLocation::Memory => Ok(Arc::new(MemoryStore::new())),
			StoreLocation::File { base_directory } => Ok(Arc::new(FileStore::open(base_directory)?)),
		}
	}
}
