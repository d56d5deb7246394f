//! The configuration-source contract and a volatile implementation.
//!
//! A configuration source owns a set of [`StoreDescriptor`]s and is
//! responsible for persisting every mutation before reporting success. The
//! engine merges any number of sources through the
//! [`StoreRegistry`](crate::StoreRegistry).

use crate::{ConfigError, StoreDescriptor};
use parking_lot::RwLock;

/// Observer of configuration mutations, notified by the registry after a
/// mutation has been durably persisted.
pub trait ConfigListener: Send + Sync {
	fn on_add(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError>;

	fn on_remove(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError>;

	fn on_modify(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError>;

	/// `old_id` is the id before the rename; `descriptor` already carries
	/// the new one.
	fn on_rename(&self, old_id: &str, descriptor: &StoreDescriptor) -> Result<(), ConfigError>;
}

/// A pluggable provider of store descriptors.
///
/// Mutations persist before returning; when persistence fails the
/// implementation rolls its in-memory state back and raises
/// [`ConfigError::Persistence`], so a failed mutation is never observable.
pub trait ConfigSource: Send + Sync {
	/// Identifies the source in logs and error messages.
	fn identifier(&self) -> &str;

	fn descriptors(&self) -> Vec<StoreDescriptor>;

	fn get(&self, id: &str) -> Option<StoreDescriptor>;

	fn contains(&self, id: &str) -> bool {
		self.get(id).is_some()
	}

	/// Whether this source is able to persist the given descriptor (a
	/// read-only source answers `false` for everything).
	fn can_persist(&self, descriptor: &StoreDescriptor) -> bool;

	fn add(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError>;

	/// Removes and returns the descriptor.
	fn remove(&self, id: &str) -> Result<StoreDescriptor, ConfigError>;

	/// Replaces the descriptor with the same id.
	fn modify(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError>;

	fn rename(&self, old_id: &str, new_id: &str) -> Result<(), ConfigError>;
}

/// A volatile, in-process configuration source. "Persistence" is the
/// in-memory mutation itself, so it never fails; a read-only instance
/// rejects every mutation via [`ConfigSource::can_persist`].
pub struct MemoryConfigSource {
	identifier: String,
	read_only: bool,
	descriptors: RwLock<Vec<StoreDescriptor>>,
}

impl MemoryConfigSource {
	pub fn new(identifier: &str, descriptors: Vec<StoreDescriptor>) -> MemoryConfigSource {
		MemoryConfigSource {
			identifier: identifier.to_string(),
			read_only: false,
			descriptors: RwLock::new(descriptors),
		}
	}

	pub fn new_read_only(identifier: &str, descriptors: Vec<StoreDescriptor>) -> MemoryConfigSource {
		MemoryConfigSource {
			read_only: true,
			..Self::new(identifier, descriptors)
		}
	}
}

impl ConfigSource for MemoryConfigSource {
	fn identifier(&self) -> &str {
		&self.identifier
	}

	fn descriptors(&self) -> Vec<StoreDescriptor> {
		self.descriptors.read().clone()
	}

	fn get(&self, id: &str) -> Option<StoreDescriptor> {
		self.descriptors.read().iter().find(|d| d.id == id).cloned()
	}

	fn can_persist(&self, _descriptor: &StoreDescriptor) -> bool {
		!self.read_only
	}

	fn add(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		let mut descriptors = self.descriptors.write();
		if descriptors.iter().any(|d| d.id == descriptor.id) {
			return Err(ConfigError::DuplicateId(descriptor.id));
		}
		descriptors.push(descriptor);
		Ok(())
	}

	fn remove(&self, id: &str) -> Result<StoreDescriptor, ConfigError> {
		let mut descriptors = self.descriptors.write();
		let position = descriptors
			.iter()
			.position(|d| d.id == id)
			.ok_or_else(|| ConfigError::NotFound(id.to_string()))?;
		Ok(descriptors.remove(position))
	}

	fn modify(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		let mut descriptors = self.descriptors.write();
		let existing = descriptors
			.iter_mut()
			.find(|d| d.id == descriptor.id)
			.ok_or_else(|| ConfigError::NotFound(descriptor.id.clone()))?;
		*existing = descriptor;
		Ok(())
	}

	fn rename(&self, old_id: &str, new_id: &str) -> Result<(), ConfigError> {
		let mut descriptors = self.descriptors.write();
		if descriptors.iter().any(|d| d.id == new_id) {
			return Err(ConfigError::DuplicateId(new_id.to_string()));
		}
		let existing = descriptors
			.iter_mut()
			.find(|d| d.id == old_id)
			.ok_or_else(|| ConfigError::NotFound(old_id.to_string()))?;
		existing.id = new_id.to_string();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_and_get() {
		let source = MemoryConfigSource::new("mem", vec![]);
		source.add(StoreDescriptor::memory("a")).unwrap();
		assert!(source.contains("a"));
		assert_eq!(source.get("a"), Some(StoreDescriptor::memory("a")));
		assert!(matches!(
			source.add(StoreDescriptor::memory("a")),
			Err(ConfigError::DuplicateId(_))
		));
	}

	#[test]
	fn remove_returns_the_descriptor() {
		let source = MemoryConfigSource::new("mem", vec![StoreDescriptor::memory("a")]);
		assert_eq!(source.remove("a").unwrap(), StoreDescriptor::memory("a"));
		assert!(matches!(source.remove("a"), Err(ConfigError::NotFound(_))));
	}

	#[test]
	fn rename_rejects_collisions() {
		let source = MemoryConfigSource::new(
			"mem",
			vec![StoreDescriptor::memory("a"), StoreDescriptor::memory("b")],
		);
		assert!(matches!(source.rename("a", "b"), Err(ConfigError::DuplicateId(_))));
		source.rename("a", "c").unwrap();
		assert!(source.contains("c"));
		assert!(!source.contains("a"));
	}

	#[test]
	fn read_only_source_persists_nothing() {
		let source = MemoryConfigSource::new_read_only("ro", vec![StoreDescriptor::memory("a")]);
		assert!(!source.can_persist(&StoreDescriptor::memory("b")));
	}
}
