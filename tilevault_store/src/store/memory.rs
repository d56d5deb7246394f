//! A volatile, hash-map-backed tile store. The reference implementation of
//! the [`TileStore`] contract and the workhorse of the engine's test
//! suites.

use crate::{
	StoreError,
	store::traits::{StorageState, TileEvent, TileListener, TileStore},
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tilevault_core::{Blob, FanoutError, ListenerSet, TileCoord, TileKey, TileRange};

#[derive(Clone, PartialEq, Eq, Hash)]
struct TileSlot {
	gridset: String,
	format: String,
	parameters_id: String,
	coord: TileCoord,
}

impl TileSlot {
	fn of(key: &TileKey) -> TileSlot {
		TileSlot {
			gridset: key.gridset.clone(),
			format: key.format.clone(),
			parameters_id: key.parameters_id.clone(),
			coord: key.coord,
		}
	}
}

#[derive(Default)]
struct LayerData {
	tiles: HashMap<TileSlot, Blob>,
	metadata: HashMap<String, String>,
}

/// In-process tile store; all content is lost on [`TileStore::destroy`].
#[derive(Default)]
pub struct MemoryStore {
	layers: RwLock<HashMap<String, LayerData>>,
	listeners: ListenerSet<dyn TileListener>,
}

impl MemoryStore {
	pub fn new() -> MemoryStore {
		MemoryStore::default()
	}

	/// Listener failures never fail the storage operation that triggered
	/// the event; the aggregate is logged instead.
	fn notify(&self, deliver: impl FnMut(&(dyn TileListener + 'static)) -> Result<(), StoreError>) {
		if let Err(FanoutError { primary, suppressed }) = self.listeners.safe_for_each(deliver) {
			log::warn!(
				"memory store: {} listener(s) failed, last error: {primary}",
				suppressed.len() + 1
			);
		}
	}
}

impl TileStore for MemoryStore {
	fn get(&self, key: &TileKey) -> Result<Option<Blob>, StoreError> {
		let layers = self.layers.read();
		Ok(
			layers
				.get(&key.layer)
				.and_then(|layer| layer.tiles.get(&TileSlot::of(key)))
				.cloned(),
		)
	}

	fn put(&self, key: &TileKey, blob: Blob) -> Result<(), StoreError> {
		let size = blob.len();
		let previous = {
			let mut layers = self.layers.write();
			layers
				.entry(key.layer.clone())
				.or_default()
				.tiles
				.insert(TileSlot::of(key), blob)
		};
		let event = TileEvent::new(key, size);
		match previous {
			Some(old) => self.notify(|l| l.tile_updated(&event, old.len())),
			None => self.notify(|l| l.tile_stored(&event)),
		}
		Ok(())
	}

	fn delete(&self, key: &TileKey) -> Result<bool, StoreError> {
		let removed = {
			let mut layers = self.layers.write();
			layers
				.get_mut(&key.layer)
				.and_then(|layer| layer.tiles.remove(&TileSlot::of(key)))
		};
		if let Some(blob) = removed {
			let event = TileEvent::new(key, blob.len());
			self.notify(|l| l.tile_deleted(&event));
			return Ok(true);
		}
		Ok(false)
	}

	fn delete_layer(&self, layer: &str) -> Result<bool, StoreError> {
		let existed = self.layers.write().remove(layer).is_some();
		if existed {
			self.notify(|l| l.layer_deleted(layer));
		}
		Ok(existed)
	}

	fn delete_gridset(&self, layer: &str, gridset: &str) -> Result<bool, StoreError> {
		let deleted = {
			let mut layers = self.layers.write();
			match layers.get_mut(layer) {
				Some(data) => {
					let before = data.tiles.len();
					data.tiles.retain(|slot, _| slot.gridset != gridset);
					data.tiles.len() < before
				}
				None => false,
			}
		};
		if deleted {
			self.notify(|l| l.gridset_deleted(layer, gridset));
		}
		Ok(deleted)
	}

	fn delete_range(&self, range: &TileRange) -> Result<bool, StoreError> {
		let mut layers = self.layers.write();
		let Some(data) = layers.get_mut(&range.layer) else {
			return Ok(false);
		};
		let before = data.tiles.len();
		data.tiles.retain(|slot, _| {
			if slot.gridset != range.gridset
				|| slot.format != range.format
				|| slot.parameters_id != range.parameters_id
			{
				return true;
			}
			match range.bounds_of(slot.coord.z) {
				Ok(bounds) => !bounds.contains(slot.coord.x, slot.coord.y),
				Err(_) => true,
			}
		});
		Ok(data.tiles.len() < before)
	}

	fn delete_by_parameters(&self, layer: &str, parameters_id: &str) -> Result<bool, StoreError> {
		let mut layers = self.layers.write();
		match layers.get_mut(layer) {
			Some(data) => {
				let before = data.tiles.len();
				data.tiles.retain(|slot, _| slot.parameters_id != parameters_id);
				Ok(data.tiles.len() < before)
			}
			None => Ok(false),
		}
	}

	fn rename_layer(&self, old_layer: &str, new_layer: &str) -> Result<bool, StoreError> {
		let renamed = {
			let mut layers = self.layers.write();
			match layers.remove(old_layer) {
				Some(data) => {
					layers.insert(new_layer.to_string(), data);
					true
				}
				None => false,
			}
		};
		if renamed {
			self.notify(|l| l.layer_renamed(old_layer, new_layer));
		}
		Ok(renamed)
	}

	fn layer_exists(&self, layer: &str) -> Result<bool, StoreError> {
		Ok(self.layers.read().contains_key(layer))
	}

	fn get_layer_metadata(&self, layer: &str, key: &str) -> Result<Option<String>, StoreError> {
		let layers = self.layers.read();
		Ok(layers.get(layer).and_then(|data| data.metadata.get(key)).cloned())
	}

	fn put_layer_metadata(&self, layer: &str, key: &str, value: &str) -> Result<(), StoreError> {
		let mut layers = self.layers.write();
		layers
			.entry(layer.to_string())
			.or_default()
			.metadata
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn add_listener(&self, listener: Arc<dyn TileListener>) {
		self.listeners.add(listener);
	}

	fn remove_listener(&self, listener: &Arc<dyn TileListener>) -> bool {
		self.listeners.remove(listener)
	}

	fn storage_state(&self) -> Result<StorageState, StoreError> {
		if self.layers.read().is_empty() {
			Ok(StorageState::Empty)
		} else {
			Ok(StorageState::Recognized)
		}
	}

	fn destroy(&self) {
		log::debug!("destroying memory store");
		self.layers.write().clear();
	}
}
