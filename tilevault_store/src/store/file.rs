//! A filesystem-backed tile store.
//!
//! Tiles live in a directory tree mirroring their identity:
//! `<base>/<layer>/<gridset>/<parameters_id>/<z>/<x>/<y>.<format>`. Layer
//! metadata is a YAML map at `<base>/<layer>/metadata.yml`. A marker file at
//! the root of the base directory tags the tree as ours, so
//! [`TileStore::storage_state`] can tell a directory this engine wrote from
//! one that belongs to somebody else.

use crate::{
	StoreError,
	store::traits::{StorageState, TileEvent, TileListener, TileStore},
};
use std::{
	collections::BTreeMap,
	fs, io,
	path::{Path, PathBuf},
	sync::Arc,
};
use tilevault_core::{Blob, FanoutError, ListenerSet, TileBounds, TileKey, TileRange};

const MARKER_FILE: &str = ".tilevault";
const METADATA_FILE: &str = "metadata.yml";

/// Tile store persisting each tile as one file under a base directory.
pub struct FileStore {
	base: PathBuf,
	listeners: ListenerSet<dyn TileListener>,
}

impl FileStore {
	/// Opens a file store rooted at `base`, creating the directory when it
	/// does not exist yet. The suitability marker is only written on the
	/// first mutation, so opening never changes what
	/// [`TileStore::storage_state`] reports.
	pub fn open(base: impl Into<PathBuf>) -> Result<FileStore, StoreError> {
		let base = base.into();
		fs::create_dir_all(&base)?;
		Ok(FileStore {
			base,
			listeners: ListenerSet::new(),
		})
	}

	pub fn base_directory(&self) -> &Path {
		&self.base
	}

	fn tile_path(&self, key: &TileKey) -> PathBuf {
		self
			.base
			.join(&key.layer)
			.join(&key.gridset)
			.join(&key.parameters_id)
			.join(key.coord.z.to_string())
			.join(key.coord.x.to_string())
			.join(format!("{}.{}", key.coord.y, key.format))
	}

	fn metadata_path(&self, layer: &str) -> PathBuf {
		self.base.join(layer).join(METADATA_FILE)
	}

	fn write_marker(&self) -> Result<(), StoreError> {
		let marker = self.base.join(MARKER_FILE);
		if !marker.exists() {
			fs::write(marker, b"")?;
		}
		Ok(())
	}

	fn read_metadata(&self, layer: &str) -> Result<BTreeMap<String, String>, StoreError> {
		match fs::read_to_string(self.metadata_path(layer)) {
			Ok(text) => {
				serde_yaml_ng::from_str(&text).map_err(|e| StoreError::Backend(format!("corrupt layer metadata: {e}")))
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
			Err(e) => Err(e.into()),
		}
	}

	fn notify(&self, deliver: impl FnMut(&(dyn TileListener + 'static)) -> Result<(), StoreError>) {
		if let Err(FanoutError { primary, suppressed }) = self.listeners.safe_for_each(deliver) {
			log::warn!(
				"file store at {:?}: {} listener(s) failed, last error: {primary}",
				self.base,
				suppressed.len() + 1
			);
		}
	}

	/// Deletes every tile file of one level directory whose coordinates fall
	/// inside `bounds`. Returns whether anything was removed.
	fn delete_level_within(&self, level_dir: &Path, bounds: &TileBounds) -> Result<bool, StoreError> {
		let mut deleted = false;
		for column in read_dir_or_empty(level_dir)? {
			let column = column?;
			let Some(x) = parse_name(&column.file_name()) else {
				continue;
			};
			if x < bounds.min_x || x > bounds.max_x || !column.path().is_dir() {
				continue;
			}
			for tile in fs::read_dir(column.path())? {
				let tile = tile?;
				let name = tile.file_name();
				let Some(y) = name.to_str().and_then(|n| n.split('.').next()).and_then(|n| n.parse::<u64>().ok()) else {
					continue;
				};
				if y >= bounds.min_y && y <= bounds.max_y {
					fs::remove_file(tile.path())?;
					deleted = true;
				}
			}
		}
		Ok(deleted)
	}
}

fn parse_name(name: &std::ffi::OsStr) -> Option<u64> {
	name.to_str()?.parse().ok()
}

/// `read_dir` treating a missing directory as empty.
fn read_dir_or_empty(path: &Path) -> Result<Vec<io::Result<fs::DirEntry>>, StoreError> {
	match fs::read_dir(path) {
		Ok(entries) => Ok(entries.collect()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
		Err(e) => Err(e.into()),
	}
}

fn remove_dir_if_present(path: &Path) -> Result<bool, StoreError> {
	if path.is_dir() {
		fs::remove_dir_all(path)?;
		Ok(true)
	} else {
		Ok(false)
	}
}

impl TileStore for FileStore {
	fn get(&self, key: &TileKey) -> Result<Option<Blob>, StoreError> {
		match fs::read(self.tile_path(key)) {
			Ok(bytes) => Ok(Some(Blob::from(bytes))),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	fn put(&self, key: &TileKey, blob: Blob) -> Result<(), StoreError> {
		let path = self.tile_path(key);
		let old_size = match fs::metadata(&path) {
			Ok(meta) => Some(meta.len()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => None,
			Err(e) => return Err(e.into()),
		};
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		let size = blob.len();
		fs::write(&path, blob.as_slice())?;
		self.write_marker()?;

		let event = TileEvent::new(key, size);
		match old_size {
			Some(old) => self.notify(|l| l.tile_updated(&event, old)),
			None => self.notify(|l| l.tile_stored(&event)),
		}
		Ok(())
	}

	fn delete(&self, key: &TileKey) -> Result<bool, StoreError> {
		let path = self.tile_path(key);
		let size = match fs::metadata(&path) {
			Ok(meta) => meta.len(),
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
			Err(e) => return Err(e.into()),
		};
		fs::remove_file(&path)?;
		let event = TileEvent::new(key, size);
		self.notify(|l| l.tile_deleted(&event));
		Ok(true)
	}

	fn delete_layer(&self, layer: &str) -> Result<bool, StoreError> {
		let existed = remove_dir_if_present(&self.base.join(layer))?;
		if existed {
			self.notify(|l| l.layer_deleted(layer));
		}
		Ok(existed)
	}

	fn delete_gridset(&self, layer: &str, gridset: &str) -> Result<bool, StoreError> {
		let existed = remove_dir_if_present(&self.base.join(layer).join(gridset))?;
		if existed {
			self.notify(|l| l.gridset_deleted(layer, gridset));
		}
		Ok(existed)
	}

	fn delete_range(&self, range: &TileRange) -> Result<bool, StoreError> {
		let variant_dir = self
			.base
			.join(&range.layer)
			.join(&range.gridset)
			.join(&range.parameters_id);
		let mut deleted = false;
		for z in range.zoom_start..=range.zoom_stop {
			let bounds = range.bounds_of(z).map_err(|e| StoreError::Backend(e.to_string()))?;
			if self.delete_level_within(&variant_dir.join(z.to_string()), bounds)? {
				deleted = true;
			}
		}
		Ok(deleted)
	}

	fn delete_by_parameters(&self, layer: &str, parameters_id: &str) -> Result<bool, StoreError> {
		let mut deleted = false;
		for gridset in read_dir_or_empty(&self.base.join(layer))? {
			let gridset = gridset?;
			if !gridset.path().is_dir() {
				continue;
			}
			if remove_dir_if_present(&gridset.path().join(parameters_id))? {
				deleted = true;
			}
		}
		Ok(deleted)
	}

	fn rename_layer(&self, old_layer: &str, new_layer: &str) -> Result<bool, StoreError> {
		let old_path = self.base.join(old_layer);
		if !old_path.is_dir() {
			return Ok(false);
		}
		let new_path = self.base.join(new_layer);
		if new_path.exists() {
			return Err(StoreError::Backend(format!(
				"can not rename layer {old_layer:?}: {new_layer:?} already exists"
			)));
		}
		fs::rename(old_path, new_path)?;
		self.notify(|l| l.layer_renamed(old_layer, new_layer));
		Ok(true)
	}

	fn layer_exists(&self, layer: &str) -> Result<bool, StoreError> {
		Ok(self.base.join(layer).is_dir())
	}

	fn get_layer_metadata(&self, layer: &str, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.read_metadata(layer)?.remove(key))
	}

	fn put_layer_metadata(&self, layer: &str, key: &str, value: &str) -> Result<(), StoreError> {
		let mut metadata = self.read_metadata(layer)?;
		metadata.insert(key.to_string(), value.to_string());
		let text =
			serde_yaml_ng::to_string(&metadata).map_err(|e| StoreError::Backend(format!("unencodable metadata: {e}")))?;
		fs::create_dir_all(self.base.join(layer))?;
		fs::write(self.metadata_path(layer), text)?;
		self.write_marker()?;
		Ok(())
	}

	fn add_listener(&self, listener: Arc<dyn TileListener>) {
		self.listeners.add(listener);
	}

	fn remove_listener(&self, listener: &Arc<dyn TileListener>) -> bool {
		self.listeners.remove(listener)
	}

	fn storage_state(&self) -> Result<StorageState, StoreError> {
		let mut entries = match fs::read_dir(&self.base) {
			Ok(entries) => entries,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StorageState::Empty),
			Err(e) => return Err(e.into()),
		};
		if self.base.join(MARKER_FILE).is_file() {
			return Ok(StorageState::Recognized);
		}
		if entries.next().is_none() {
			Ok(StorageState::Empty)
		} else {
			Ok(StorageState::Foreign)
		}
	}

	fn destroy(&self) {
		// tile files stay on disk; only the handle goes away
		log::debug!("releasing file store at {:?}", self.base);
	}
}
