//! Backend descriptors: the configuration records describing one tile
//! store each.
//!
//! Descriptors are plain data. The set of backend kinds is closed: every
//! kind is a [`StoreLocation`] variant with explicit serde encode/decode,
//! so a configuration file can never smuggle in an unknown store type.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a store keeps its data. One variant per backend kind.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreLocation {
	/// Volatile in-process storage.
	Memory,
	/// A directory tree on the local filesystem.
	File { base_directory: PathBuf },
}

/// The configuration record of one tile store.
///
/// At most one enabled descriptor may be the default, and the id must not
/// collide with the router's reserved default-slot identifier; both rules
/// are enforced when the router loads a descriptor set.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StoreDescriptor {
	pub id: String,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	#[serde(default, rename = "default")]
	pub is_default: bool,
	pub location: StoreLocation,
}

fn default_enabled() -> bool {
	true
}

impl StoreDescriptor {
	/// An enabled, non-default in-memory store.
	pub fn memory(id: &str) -> StoreDescriptor {
		StoreDescriptor {
			id: id.to_string(),
			enabled: true,
			is_default: false,
			location: StoreLocation::Memory,
		}
	}

	/// An enabled, non-default file store rooted at `base_directory`.
	pub fn file(id: &str, base_directory: impl Into<PathBuf>) -> StoreDescriptor {
		StoreDescriptor {
			id: id.to_string(),
			enabled: true,
			is_default: false,
			location: StoreLocation::File {
				base_directory: base_directory.into(),
			},
		}
	}

	pub fn with_default(mut self, is_default: bool) -> StoreDescriptor {
		self.is_default = is_default;
		self
	}

	pub fn with_enabled(mut self, enabled: bool) -> StoreDescriptor {
		self.enabled = enabled;
		self
	}
}
