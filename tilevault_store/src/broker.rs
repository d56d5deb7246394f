//! The storage façade the rest of an application talks to.
//!
//! A [`TileBroker`] pairs the routed persistent storage with the transient
//! in-memory cache for tiles that are rendered but not yet durably written.
//! Persistent operations delegate to the [`StoreRouter`]; the transient
//! side is keyed by [`TileKey::cache_path`] and hands every payload out at
//! most once.

use crate::{StoreError, StoreRouter, store::TileListener};
use parking_lot::Mutex;
use std::sync::Arc;
use tilevault_core::{Blob, TileKey, TileRange, TransientCache};

pub struct TileBroker {
	router: Arc<StoreRouter>,
	transient: Mutex<TransientCache>,
}

impl TileBroker {
	pub fn new(router: Arc<StoreRouter>, transient: TransientCache) -> TileBroker {
		TileBroker {
			router,
			transient: Mutex::new(transient),
		}
	}

	pub fn router(&self) -> &Arc<StoreRouter> {
		&self.router
	}

	pub fn get(&self, key: &TileKey) -> Result<Option<Blob>, StoreError> {
		self.router.get(key)
	}

	pub fn put(&self, key: &TileKey, blob: Blob) -> Result<(), StoreError> {
		self.router.put(key, blob)
	}

	pub fn delete(&self, key: &TileKey) -> Result<bool, StoreError> {
		self.router.delete(key)
	}

	pub fn delete_layer(&self, layer: &str) -> Result<bool, StoreError> {
		self.router.delete_layer(layer)
	}

	pub fn delete_gridset(&self, layer: &str, gridset: &str) -> Result<bool, StoreError> {
		self.router.delete_gridset(layer, gridset)
	}

	pub fn delete_range(&self, range: &TileRange) -> Result<bool, StoreError> {
		self.router.delete_range(range)
	}

	pub fn delete_by_parameters(&self, layer: &str, parameters_id: &str) -> Result<bool, StoreError> {
		self.router.delete_by_parameters(layer, parameters_id)
	}

	pub fn rename_layer(&self, old_layer: &str, new_layer: &str) -> Result<bool, StoreError> {
		self.router.rename_layer(old_layer, new_layer)
	}

	pub fn layer_exists(&self, layer: &str) -> Result<bool, StoreError> {
		self.router.layer_exists(layer)
	}

	pub fn get_layer_metadata(&self, layer: &str, key: &str) -> Result<Option<String>, StoreError> {
		self.router.get_layer_metadata(layer, key)
	}

	pub fn put_layer_metadata(&self, layer: &str, key: &str, value: &str) -> Result<(), StoreError> {
		self.router.put_layer_metadata(layer, key, value)
	}

	/// Parks a freshly rendered payload for the short window before its
	/// backend write becomes visible.
	pub fn put_transient(&self, key: &TileKey, blob: Blob) {
		self.transient.lock().put(&key.cache_path(), blob);
	}

	/// Takes a parked payload; a second call for the same key misses.
	pub fn get_transient(&self, key: &TileKey) -> Option<Blob> {
		self.transient.lock().get(&key.cache_path())
	}

	pub fn add_listener(&self, listener: Arc<dyn TileListener>) {
		self.router.add_listener(listener);
	}

	pub fn remove_listener(&self, listener: &Arc<dyn TileListener>) -> bool {
		self.router.remove_listener(listener)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		DefaultStoreFactory, LayerLookup, SuitabilityPolicy,
		config::StoreDescriptor,
	};
	use tilevault_core::TileCoord;

	struct NoAssignments;

	impl LayerLookup for NoAssignments {
		fn store_id_for(&self, _layer: &str) -> Result<Option<String>, StoreError> {
			Ok(None)
		}
	}

	fn broker() -> TileBroker {
		let router = StoreRouter::new(
			Arc::new(NoAssignments),
			Arc::new(DefaultStoreFactory),
			None,
			SuitabilityPolicy::Existing,
			&[StoreDescriptor::memory("mem").with_default(true)],
		)
		.unwrap();
		TileBroker::new(Arc::new(router), TransientCache::new(16, 64, 60_000))
	}

	fn key(layer: &str) -> TileKey {
		TileKey::without_parameters(layer, "WebMercatorQuad", "png", TileCoord::new(2, 1, 3))
	}

	#[test]
	fn persistent_round_trip() {
		let broker = broker();
		let k = key("osm");
		broker.put(&k, Blob::from("tile")).unwrap();
		assert_eq!(broker.get(&k).unwrap(), Some(Blob::from("tile")));
		assert!(broker.layer_exists("osm").unwrap());
		assert!(broker.delete(&k).unwrap());
		assert_eq!(broker.get(&k).unwrap(), None);
	}

	#[test]
	fn transient_entries_read_once() {
		let broker = broker();
		let k = key("osm");
		broker.put_transient(&k, Blob::from("pending"));
		assert_eq!(broker.get_transient(&k), Some(Blob::from("pending")));
		assert_eq!(broker.get_transient(&k), None);
	}

	#[test]
	fn transient_and_persistent_sides_are_independent() {
		let broker = broker();
		let k = key("osm");
		broker.put_transient(&k, Blob::from("pending"));
		assert_eq!(broker.get(&k).unwrap(), None);
		broker.put(&k, Blob::from("durable")).unwrap();
		assert_eq!(broker.get_transient(&k), Some(Blob::from("pending")));
	}

	#[test]
	fn metadata_and_rename_delegate() {
		let broker = broker();
		broker.put(&key("osm"), Blob::from("x")).unwrap();
		broker.put_layer_metadata("osm", "srs", "EPSG:3857").unwrap();
		assert!(broker.rename_layer("osm", "streets").unwrap());
		assert_eq!(
			broker.get_layer_metadata("streets", "srs").unwrap(),
			Some("EPSG:3857".to_string())
		);
	}
}
