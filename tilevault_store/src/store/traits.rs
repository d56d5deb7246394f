//! The persistence contract every tile store backend implements, and the
//! tile-event observer interface.

use crate::StoreError;
use std::{fmt, sync::Arc};
use tilevault_core::{Blob, TileCoord, TileKey, TileRange};

/// What a store's underlying persistence currently holds, as reported by
/// [`TileStore::storage_state`]. Drives the suitability check applied to
/// newly configured stores.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StorageState {
	/// No persisted content at all.
	Empty,
	/// Content written by this engine.
	Recognized,
	/// Content this engine does not recognize as its own.
	Foreign,
}

impl fmt::Display for StorageState {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			StorageState::Empty => write!(f, "empty"),
			StorageState::Recognized => write!(f, "recognized"),
			StorageState::Foreign => write!(f, "foreign"),
		}
	}
}

/// Payload of a tile event: the identity of the affected tile plus its
/// payload size(s) in bytes.
#[derive(Clone, Debug)]
pub struct TileEvent {
	pub layer: String,
	pub gridset: String,
	pub format: String,
	pub parameters_id: String,
	pub coord: TileCoord,
	pub size: u64,
}

impl TileEvent {
	pub fn new(key: &TileKey, size: u64) -> TileEvent {
		TileEvent {
			layer: key.layer.clone(),
			gridset: key.gridset.clone(),
			format: key.format.clone(),
			parameters_id: key.parameters_id.clone(),
			coord: key.coord,
			size,
		}
	}
}

/// Observer of storage mutations. All methods default to no-ops so
/// implementations only override the events they care about.
#[allow(unused_variables)]
pub trait TileListener: Send + Sync {
	fn tile_stored(&self, event: &TileEvent) -> Result<(), StoreError> {
		Ok(())
	}

	/// A stored tile was overwritten; `old_size` is the replaced payload's
	/// size.
	fn tile_updated(&self, event: &TileEvent, old_size: u64) -> Result<(), StoreError> {
		Ok(())
	}

	fn tile_deleted(&self, event: &TileEvent) -> Result<(), StoreError> {
		Ok(())
	}

	fn layer_deleted(&self, layer: &str) -> Result<(), StoreError> {
		Ok(())
	}

	fn layer_renamed(&self, old_layer: &str, new_layer: &str) -> Result<(), StoreError> {
		Ok(())
	}

	fn gridset_deleted(&self, layer: &str, gridset: &str) -> Result<(), StoreError> {
		Ok(())
	}
}

/// The persistence interface of one concrete tile store backend.
///
/// Implementations are shared across threads behind `Arc`, so every method
/// takes `&self`; interior mutability and locking are the implementation's
/// concern. All operations are synchronous and may block on I/O.
pub trait TileStore: Send + Sync {
	/// Fetches a tile payload; `None` when the tile is not stored.
	fn get(&self, key: &TileKey) -> Result<Option<Blob>, StoreError>;

	/// Stores (or overwrites) a tile payload.
	fn put(&self, key: &TileKey, blob: Blob) -> Result<(), StoreError>;

	/// Deletes one tile; returns whether it existed.
	fn delete(&self, key: &TileKey) -> Result<bool, StoreError>;

	/// Deletes everything stored for a layer; returns whether anything was
	/// deleted.
	fn delete_layer(&self, layer: &str) -> Result<bool, StoreError>;

	/// Deletes a layer's tiles for one grid set.
	fn delete_gridset(&self, layer: &str, gridset: &str) -> Result<bool, StoreError>;

	/// Deletes every tile covered by the range.
	fn delete_range(&self, range: &TileRange) -> Result<bool, StoreError>;

	/// Deletes a layer's tiles stored under one parameter digest.
	fn delete_by_parameters(&self, layer: &str, parameters_id: &str) -> Result<bool, StoreError>;

	/// Moves a layer's content to a new name; returns whether the old
	/// layer existed here.
	fn rename_layer(&self, old_layer: &str, new_layer: &str) -> Result<bool, StoreError>;

	fn layer_exists(&self, layer: &str) -> Result<bool, StoreError>;

	fn get_layer_metadata(&self, layer: &str, key: &str) -> Result<Option<String>, StoreError>;

	fn put_layer_metadata(&self, layer: &str, key: &str, value: &str) -> Result<(), StoreError>;

	fn add_listener(&self, listener: Arc<dyn TileListener>);

	fn remove_listener(&self, listener: &Arc<dyn TileListener>) -> bool;

	/// Reports what the underlying persistence currently holds.
	fn storage_state(&self) -> Result<StorageState, StoreError>;

	/// Releases the store's resources. Called exactly once, when the store
	/// is replaced by a configuration change or on shutdown.
	fn destroy(&self);
}
