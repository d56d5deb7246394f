//! A YAML-file-backed configuration source.
//!
//! Descriptors live in one YAML document. Every mutation rewrites the file
//! through a temporary sibling followed by an atomic rename; when the write
//! fails the in-memory state is rolled back and the mutation surfaces as
//! [`ConfigError::Persistence`].

use crate::{ConfigError, ConfigSource, StoreDescriptor};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
	fs,
	path::{Path, PathBuf},
};

#[derive(Serialize, Deserialize, Default)]
struct ConfigDocument {
	#[serde(default)]
	stores: Vec<StoreDescriptor>,
}

/// Configuration source persisting descriptors to a single YAML file.
pub struct FileConfigSource {
	identifier: String,
	path: PathBuf,
	descriptors: Mutex<Vec<StoreDescriptor>>,
}

impl FileConfigSource {
	/// Opens (or initializes) the configuration file at `path`. A missing
	/// file reads as an empty descriptor set.
	pub fn open(path: impl Into<PathBuf>) -> Result<FileConfigSource> {
		let path = path.into();
		let descriptors = if path.exists() {
			let text = fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
			let document: ConfigDocument =
				serde_yaml_ng::from_str(&text).with_context(|| format!("failed to parse {path:?}"))?;
			document.stores
		} else {
			Vec::new()
		};
		Ok(FileConfigSource {
			identifier: format!("file:{}", path.display()),
			path,
			descriptors: Mutex::new(descriptors),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_document(&self, descriptors: &[StoreDescriptor]) -> Result<()> {
		let document = ConfigDocument {
			stores: descriptors.to_vec(),
		};
		let text = serde_yaml_ng::to_string(&document)?;
		let temp = self.path.with_extension("yml.tmp");
		fs::write(&temp, text).with_context(|| format!("failed to write {temp:?}"))?;
		fs::rename(&temp, &self.path).with_context(|| format!("failed to replace {:?}", self.path))?;
		Ok(())
	}

	/// Applies `mutate` to a working copy, persists it, and commits the
	/// copy only when the write succeeded.
	fn persist_mutation<T>(
		&self,
		mutate: impl FnOnce(&mut Vec<StoreDescriptor>) -> Result<T, ConfigError>,
	) -> Result<T, ConfigError> {
		let mut descriptors = self.descriptors.lock();
		let mut working = descriptors.clone();
		let value = mutate(&mut working)?;
		if let Err(error) = self.write_document(&working) {
			log::warn!("{}: rolling back unpersistable mutation: {error:#}", self.identifier);
			return Err(ConfigError::Persistence {
				reason: format!("{error:#}"),
			});
		}
		*descriptors = working;
		Ok(value)
	}
}

impl ConfigSource for FileConfigSource {
	fn identifier(&self) -> &str {
		&self.identifier
	}

	fn descriptors(&self) -> Vec<StoreDescriptor> {
		self.descriptors.lock().clone()
	}

	fn get(&self, id: &str) -> Option<StoreDescriptor> {
		self.descriptors.lock().iter().find(|d| d.id == id).cloned()
	}

	fn can_persist(&self, _descriptor: &StoreDescriptor) -> bool {
		true
	}

	fn add(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		self.persist_mutation(|descriptors| {
			if descriptors.iter().any(|d| d.id == descriptor.id) {
				return Err(ConfigError::DuplicateId(descriptor.id.clone()));
			}
			descriptors.push(descriptor);
			Ok(())
		})
	}

	fn remove(&self, id: &str) -> Result<StoreDescriptor, ConfigError> {
		self.persist_mutation(|descriptors| {
			let position = descriptors
				.iter()
				.position(|d| d.id == id)
				.ok_or_else(|| ConfigError::NotFound(id.to_string()))?;
			Ok(descriptors.remove(position))
		})
	}

	fn modify(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		self.persist_mutation(|descriptors| {
			let existing = descriptors
				.iter_mut()
				.find(|d| d.id == descriptor.id)
				.ok_or_else(|| ConfigError::NotFound(descriptor.id.clone()))?;
			*existing = descriptor;
			Ok(())
		})
	}

	fn rename(&self, old_id: &str, new_id: &str) -> Result<(), ConfigError> {
		self.persist_mutation(|descriptors| {
			if descriptors.iter().any(|d| d.id == new_id) {
				return Err(ConfigError::DuplicateId(new_id.to_string()));
			}
			let existing = descriptors
				.iter_mut()
				.find(|d| d.id == old_id)
				.ok_or_else(|| ConfigError::NotFound(old_id.to_string()))?;
			existing.id = new_id.to_string();
			Ok(())
		})
	}
}
