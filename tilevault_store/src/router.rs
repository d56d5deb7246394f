//! The store router: the live id → backend mapping behind every tile
//! operation.
//!
//! The router holds one live instance per enabled descriptor plus a default
//! slot for layers without an explicit assignment. Tile operations run
//! under a shared lock; configuration changes take the exclusive lock, swap
//! the affected entries and destroy replaced instances exactly once, after
//! the lock is released. Registered as a [`ConfigListener`] it keeps itself
//! in sync with registry mutations.

use crate::{
	ConfigError, ConfigListener, StoreError,
	config::StoreDescriptor,
	store::{FileStore, StoreFactory, TileListener, TileStore},
};
use parking_lot::RwLock;
use std::{
	collections::HashMap,
	mem,
	path::{Path, PathBuf},
	sync::Arc,
};
use tilevault_core::{Blob, ListenerSet, TileKey, TileRange};

/// Identifier of the reserved default slot. Never a valid descriptor id; a
/// layer assigned to it resolves to whatever store is the default right now.
pub const DEFAULT_SLOT_ID: &str = "__default__";

/// Maps a layer to the id of the store holding it. `None` (and the reserved
/// slot id) mean "use the default store".
pub trait LayerLookup: Send + Sync {
	fn store_id_for(&self, layer: &str) -> Result<Option<String>, StoreError>;
}

/// What a newly configured store's persistence may already contain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SuitabilityPolicy {
	/// Accept anything, even storage written by another system.
	AllowAny,
	/// Accept empty storage or storage this engine wrote.
	Existing,
	/// Accept empty storage only.
	Empty,
}

impl SuitabilityPolicy {
	fn accepts(self, state: crate::store::StorageState) -> bool {
		use crate::store::StorageState;
		match self {
			SuitabilityPolicy::AllowAny => true,
			SuitabilityPolicy::Existing => matches!(state, StorageState::Empty | StorageState::Recognized),
			SuitabilityPolicy::Empty => state == StorageState::Empty,
		}
	}
}

/// One routing entry: the descriptor plus its live instance (`None` while
/// the store is disabled).
struct LiveStore {
	descriptor: StoreDescriptor,
	instance: Option<Arc<dyn TileStore>>,
}

struct RouterState {
	stores: HashMap<String, LiveStore>,
	/// Id of the descriptor currently defaulted; `None` when the slot holds
	/// the synthetic fallback (or nothing).
	default_id: Option<String>,
	default_store: Option<Arc<dyn TileStore>>,
}

pub struct StoreRouter {
	state: RwLock<RouterState>,
	layers: Arc<dyn LayerLookup>,
	factory: Arc<dyn StoreFactory>,
	/// Directory of the synthetic file-store default installed when no
	/// descriptor is defaulted. `None` disables the fallback.
	fallback_directory: Option<PathBuf>,
	suitability: SuitabilityPolicy,
	listeners: ListenerSet<dyn TileListener>,
}

impl StoreRouter {
	/// Builds the routing table from an initial descriptor set.
	///
	/// # Errors
	/// Rejects structurally invalid sets (empty, reserved or duplicate ids,
	/// more than one default, a disabled default) and fails with
	/// [`ConfigError::StoreFailure`] when a backend can not be instantiated;
	/// instances created before the failure are destroyed again.
	pub fn new(
		layers: Arc<dyn LayerLookup>,
		factory: Arc<dyn StoreFactory>,
		fallback_directory: Option<PathBuf>,
		suitability: SuitabilityPolicy,
		descriptors: &[StoreDescriptor],
	) -> Result<StoreRouter, ConfigError> {
		let listeners = ListenerSet::new();
		let state = build_state(&*factory, fallback_directory.as_deref(), &listeners, descriptors)?;
		Ok(StoreRouter {
			state: RwLock::new(state),
			layers,
			factory,
			fallback_directory,
			suitability,
			listeners,
		})
	}

	/// Replaces the whole routing table. Previous instances are destroyed
	/// after the new table is in place.
	pub fn reload(&self, descriptors: &[StoreDescriptor]) -> Result<(), ConfigError> {
		let new_state = build_state(
			&*self.factory,
			self.fallback_directory.as_deref(),
			&self.listeners,
			descriptors,
		)?;
		log::info!("reloading tile store routing table ({} stores)", new_state.stores.len());
		let old_state = {
			let mut state = self.state.write();
			mem::replace(&mut *state, new_state)
		};
		self.destroy_dropped(unique_instances(&old_state));
		Ok(())
	}

	/// Destroys every live instance and empties the routing table.
	pub fn destroy(&self) {
		let mut state = self.state.write();
		for instance in unique_instances(&state) {
			instance.destroy();
		}
		state.stores.clear();
		state.default_id = None;
		state.default_store = None;
	}

	pub fn get(&self, key: &TileKey) -> Result<Option<Blob>, StoreError> {
		self.with_store(&key.layer, |store| store.get(key))
	}

	pub fn put(&self, key: &TileKey, blob: Blob) -> Result<(), StoreError> {
		self.with_store(&key.layer, |store| store.put(key, blob))
	}

	pub fn delete(&self, key: &TileKey) -> Result<bool, StoreError> {
		self.with_store(&key.layer, |store| store.delete(key))
	}

	pub fn delete_layer(&self, layer: &str) -> Result<bool, StoreError> {
		self.with_store(layer, |store| store.delete_layer(layer))
	}

	pub fn delete_gridset(&self, layer: &str, gridset: &str) -> Result<bool, StoreError> {
		self.with_store(layer, |store| store.delete_gridset(layer, gridset))
	}

	pub fn delete_range(&self, range: &TileRange) -> Result<bool, StoreError> {
		self.with_store(&range.layer, |store| store.delete_range(range))
	}

	pub fn delete_by_parameters(&self, layer: &str, parameters_id: &str) -> Result<bool, StoreError> {
		self.with_store(layer, |store| store.delete_by_parameters(layer, parameters_id))
	}

	/// Renames a layer in every enabled store; `true` when at least one
	/// store held the layer.
	pub fn rename_layer(&self, old_layer: &str, new_layer: &str) -> Result<bool, StoreError> {
		let state = self.state.read();
		let mut renamed = false;
		for instance in unique_instances(&state) {
			if instance.rename_layer(old_layer, new_layer)? {
				renamed = true;
			}
		}
		Ok(renamed)
	}

	pub fn layer_exists(&self, layer: &str) -> Result<bool, StoreError> {
		self.with_store(layer, |store| store.layer_exists(layer))
	}

	pub fn get_layer_metadata(&self, layer: &str, key: &str) -> Result<Option<String>, StoreError> {
		self.with_store(layer, |store| store.get_layer_metadata(layer, key))
	}

	pub fn put_layer_metadata(&self, layer: &str, key: &str, value: &str) -> Result<(), StoreError> {
		self.with_store(layer, |store| store.put_layer_metadata(layer, key, value))
	}

	/// Registers a tile listener on every current and future live store.
	pub fn add_listener(&self, listener: Arc<dyn TileListener>) {
		self.listeners.add(listener.clone());
		let state = self.state.read();
		for instance in unique_instances(&state) {
			instance.add_listener(listener.clone());
		}
	}

	pub fn remove_listener(&self, listener: &Arc<dyn TileListener>) -> bool {
		let removed = self.listeners.remove(listener);
		let state = self.state.read();
		for instance in unique_instances(&state) {
			instance.remove_listener(listener);
		}
		removed
	}

	fn with_store<T>(
		&self,
		layer: &str,
		op: impl FnOnce(&dyn TileStore) -> Result<T, StoreError>,
	) -> Result<T, StoreError> {
		let assigned = self.layers.store_id_for(layer)?;
		let state = self.state.read();
		let store = match assigned {
			Some(id) if id != DEFAULT_SLOT_ID => {
				let entry = state.stores.get(&id).ok_or_else(|| StoreError::NoSuchStore(id.clone()))?;
				match &entry.instance {
					Some(instance) => instance.clone(),
					None => return Err(StoreError::StoreDisabled(id)),
				}
			}
			_ => state.default_store.clone().ok_or(StoreError::NoDefaultStore)?,
		};
		op(store.as_ref())
	}

	/// Instantiates a store for a runtime configuration change: the
	/// suitability policy is applied and current listeners are registered.
	fn create_checked(&self, descriptor: &StoreDescriptor) -> Result<Arc<dyn TileStore>, ConfigError> {
		let store = self.factory.create(descriptor).map_err(|source| ConfigError::StoreFailure {
			id: descriptor.id.clone(),
			source: Box::new(source),
		})?;
		let storage = store.storage_state().map_err(|source| ConfigError::StoreFailure {
			id: descriptor.id.clone(),
			source: Box::new(source),
		})?;
		if !self.suitability.accepts(storage) {
			store.destroy();
			return Err(ConfigError::StoreFailure {
				id: descriptor.id.clone(),
				source: Box::new(StoreError::UnsuitableStorage {
					id: descriptor.id.clone(),
					state: storage,
				}),
			});
		}
		for listener in self.listeners.snapshot() {
			store.add_listener(listener);
		}
		Ok(store)
	}

	fn open_fallback(&self) -> Result<Option<Arc<dyn TileStore>>, ConfigError> {
		let Some(path) = &self.fallback_directory else {
			return Ok(None);
		};
		let store = open_fallback_at(path, &self.listeners)?;
		Ok(Some(store))
	}

	/// Destroys every instance of `dropped` that is no longer referenced by
	/// the routing table, each at most once.
	fn destroy_dropped(&self, dropped: Vec<Arc<dyn TileStore>>) {
		let kept: Vec<*const ()> = {
			let state = self.state.read();
			unique_instances(&state).iter().map(ptr_of).collect()
		};
		let mut destroyed: Vec<*const ()> = Vec::new();
		for instance in dropped {
			let ptr = ptr_of(&instance);
			if !kept.contains(&ptr) && !destroyed.contains(&ptr) {
				destroyed.push(ptr);
				instance.destroy();
			}
		}
	}
}

impl ConfigListener for StoreRouter {
	fn on_add(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
		validate_id(&descriptor.id)?;
		if descriptor.is_default && !descriptor.enabled {
			return Err(ConfigError::DisabledDefault(descriptor.id.clone()));
		}
		let mut state = self.state.write();
		if state.stores.contains_key(&descriptor.id) {
			return Err(ConfigError::DuplicateId(descriptor.id.clone()));
		}
		if descriptor.is_default
			&& let Some(current) = &state.default_id
		{
			return Err(ConfigError::DuplicateDefault(current.clone(), descriptor.id.clone()));
		}
		let instance = if descriptor.enabled {
			Some(self.create_checked(descriptor)?)
		} else {
			None
		};
		let mut dropped = Vec::new();
		if descriptor.is_default {
			if let Some(previous) = state.default_store.take() {
				dropped.push(previous);
			}
			state.default_store = instance.clone();
			state.default_id = Some(descriptor.id.clone());
		}
		state.stores.insert(
			descriptor.id.clone(),
			LiveStore {
				descriptor: descriptor.clone(),
				instance,
			},
		);
		drop(state);
		self.destroy_dropped(dropped);
		Ok(())
	}

	fn on_remove(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
		let id = &descriptor.id;
		let mut state = self.state.write();
		if !state.stores.contains_key(id) {
			return Err(ConfigError::NotFound(id.clone()));
		}
		let was_default = state.default_id.as_deref() == Some(id);
		let fallback = if was_default { self.open_fallback()? } else { None };

		let mut dropped = Vec::new();
		if let Some(entry) = state.stores.remove(id)
			&& let Some(instance) = entry.instance
		{
			dropped.push(instance);
		}
		if was_default {
			if let Some(previous) = state.default_store.take() {
				dropped.push(previous);
			}
			state.default_store = fallback;
			state.default_id = None;
		}
		drop(state);
		self.destroy_dropped(dropped);
		Ok(())
	}

	fn on_modify(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
		if descriptor.is_default && !descriptor.enabled {
			return Err(ConfigError::DisabledDefault(descriptor.id.clone()));
		}
		let mut state = self.state.write();
		if !state.stores.contains_key(&descriptor.id) {
			return Err(ConfigError::NotFound(descriptor.id.clone()));
		}
		if descriptor.is_default
			&& let Some(current) = &state.default_id
			&& current != &descriptor.id
		{
			return Err(ConfigError::DuplicateDefault(current.clone(), descriptor.id.clone()));
		}
		let was_default = state.default_id.as_deref() == Some(descriptor.id.as_str());
		let fallback = if was_default && !descriptor.is_default {
			self.open_fallback()?
		} else {
			None
		};
		let instance = if descriptor.enabled {
			Some(self.create_checked(descriptor)?)
		} else {
			None
		};

		let mut dropped = Vec::new();
		if let Some(previous) = state.stores.insert(
			descriptor.id.clone(),
			LiveStore {
				descriptor: descriptor.clone(),
				instance: instance.clone(),
			},
		) && let Some(old_instance) = previous.instance
		{
			dropped.push(old_instance);
		}
		if descriptor.is_default {
			if let Some(previous) = state.default_store.take() {
				dropped.push(previous);
			}
			state.default_store = instance;
			state.default_id = Some(descriptor.id.clone());
		} else if was_default {
			if let Some(previous) = state.default_store.take() {
				dropped.push(previous);
			}
			state.default_store = fallback;
			state.default_id = None;
		}
		drop(state);
		self.destroy_dropped(dropped);
		Ok(())
	}

	fn on_rename(&self, old_id: &str, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
		validate_id(&descriptor.id)?;
		let mut state = self.state.write();
		if state.stores.contains_key(&descriptor.id) {
			return Err(ConfigError::DuplicateId(descriptor.id.clone()));
		}
		let Some(mut entry) = state.stores.remove(old_id) else {
			return Err(ConfigError::NotFound(old_id.to_string()));
		};
		entry.descriptor = descriptor.clone();
		state.stores.insert(descriptor.id.clone(), entry);
		if state.default_id.as_deref() == Some(old_id) {
			state.default_id = Some(descriptor.id.clone());
		}
		Ok(())
	}
}

fn validate_id(id: &str) -> Result<(), ConfigError> {
	if id.is_empty() {
		return Err(ConfigError::EmptyId);
	}
	if id == DEFAULT_SLOT_ID {
		return Err(ConfigError::ReservedId(id.to_string()));
	}
	Ok(())
}

fn ptr_of(store: &Arc<dyn TileStore>) -> *const () {
	Arc::as_ptr(store).cast()
}

/// All distinct live instances of a routing table (the default slot may
/// alias a named entry).
fn unique_instances(state: &RouterState) -> Vec<Arc<dyn TileStore>> {
	let mut seen: Vec<*const ()> = Vec::new();
	let mut instances = Vec::new();
	let mut push = |instance: &Arc<dyn TileStore>| {
		let ptr = ptr_of(instance);
		if !seen.contains(&ptr) {
			seen.push(ptr);
			instances.push(instance.clone());
		}
	};
	if let Some(default_store) = &state.default_store {
		push(default_store);
	}
	for entry in state.stores.values() {
		if let Some(instance) = &entry.instance {
			push(instance);
		}
	}
	instances
}

fn open_fallback_at(
	path: &Path,
	listeners: &ListenerSet<dyn TileListener>,
) -> Result<Arc<dyn TileStore>, ConfigError> {
	let store = FileStore::open(path).map_err(|source| ConfigError::StoreFailure {
		id: DEFAULT_SLOT_ID.to_string(),
		source: Box::new(source),
	})?;
	let store: Arc<dyn TileStore> = Arc::new(store);
	for listener in listeners.snapshot() {
		store.add_listener(listener);
	}
	Ok(store)
}

fn build_state(
	factory: &dyn StoreFactory,
	fallback_directory: Option<&Path>,
	listeners: &ListenerSet<dyn TileListener>,
	descriptors: &[StoreDescriptor],
) -> Result<RouterState, ConfigError> {
	let mut seen: Vec<&str> = Vec::new();
	let mut default_id: Option<String> = None;
	for descriptor in descriptors {
		validate_id(&descriptor.id)?;
		if seen.contains(&descriptor.id.as_str()) {
			return Err(ConfigError::DuplicateId(descriptor.id.clone()));
		}
		seen.push(&descriptor.id);
		if descriptor.is_default {
			if !descriptor.enabled {
				return Err(ConfigError::DisabledDefault(descriptor.id.clone()));
			}
			if let Some(first) = &default_id {
				return Err(ConfigError::DuplicateDefault(first.clone(), descriptor.id.clone()));
			}
			default_id = Some(descriptor.id.clone());
		}
	}

	let mut stores = HashMap::new();
	let mut created: Vec<Arc<dyn TileStore>> = Vec::new();
	for descriptor in descriptors {
		let instance = if descriptor.enabled {
			match factory.create(descriptor) {
				Ok(store) => {
					for listener in listeners.snapshot() {
						store.add_listener(listener);
					}
					created.push(store.clone());
					Some(store)
				}
				Err(source) => {
					for store in created {
						store.destroy();
					}
					return Err(ConfigError::StoreFailure {
						id: descriptor.id.clone(),
						source: Box::new(source),
					});
				}
			}
		} else {
			None
		};
		stores.insert(
			descriptor.id.clone(),
			LiveStore {
				descriptor: descriptor.clone(),
				instance,
			},
		);
	}

	let default_store = match &default_id {
		Some(id) => stores.get(id).and_then(|entry| entry.instance.clone()),
		None => match fallback_directory {
			Some(path) => match open_fallback_at(path, listeners) {
				Ok(store) => Some(store),
				Err(error) => {
					for store in created {
						store.destroy();
					}
					return Err(error);
				}
			},
			None => None,
		},
	};

	Ok(RouterState {
		stores,
		default_id,
		default_store,
	})
}
