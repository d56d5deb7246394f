//! The store registry: one mutation façade over any number of
//! configuration sources.
//!
//! Reads merge the descriptors of every source in registration order.
//! Mutations pick the owning source: an `add` goes to the first source able
//! to persist the descriptor, every other mutation goes to the source that
//! holds the descriptor today. Configuration listeners are notified only
//! after the owning source has durably persisted the change; their failures
//! surface as [`ConfigError::ListenerFailure`] without undoing the change.

use crate::{ConfigError, ConfigListener, ConfigSource, DEFAULT_SLOT_ID, StoreDescriptor};
use parking_lot::Mutex;
use std::sync::Arc;
use tilevault_core::ListenerSet;

pub struct StoreRegistry {
	sources: Vec<Arc<dyn ConfigSource>>,
	listeners: ListenerSet<dyn ConfigListener>,
	// serializes check-then-mutate sequences spanning multiple sources
	mutation: Mutex<()>,
}

impl StoreRegistry {
	pub fn new(sources: Vec<Arc<dyn ConfigSource>>) -> StoreRegistry {
		StoreRegistry {
			sources,
			listeners: ListenerSet::new(),
			mutation: Mutex::new(()),
		}
	}

	/// All descriptors of all sources, in source order.
	pub fn descriptors(&self) -> Vec<StoreDescriptor> {
		self.sources.iter().flat_map(|source| source.descriptors()).collect()
	}

	pub fn get(&self, id: &str) -> Option<StoreDescriptor> {
		self.sources.iter().find_map(|source| source.get(id))
	}

	pub fn contains(&self, id: &str) -> bool {
		self.get(id).is_some()
	}

	pub fn add_listener(&self, listener: Arc<dyn ConfigListener>) {
		self.listeners.add(listener);
	}

	pub fn remove_listener(&self, listener: &Arc<dyn ConfigListener>) -> bool {
		self.listeners.remove(listener)
	}

	/// Adds a descriptor to the first source able to persist it.
	pub fn add(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		let _guard = self.mutation.lock();
		if descriptor.id.is_empty() {
			return Err(ConfigError::EmptyId);
		}
		if descriptor.id == DEFAULT_SLOT_ID {
			return Err(ConfigError::ReservedId(descriptor.id));
		}
		if self.contains(&descriptor.id) {
			return Err(ConfigError::DuplicateId(descriptor.id));
		}
		let source = self
			.sources
			.iter()
			.find(|source| source.can_persist(&descriptor))
			.ok_or_else(|| ConfigError::Unpersistable(descriptor.id.clone()))?;
		log::info!("adding tile store {:?} to {}", descriptor.id, source.identifier());
		source.add(descriptor.clone())?;
		self.notify(|listener| listener.on_add(&descriptor))
	}

	/// Removes a descriptor from whichever source holds it.
	pub fn remove(&self, id: &str) -> Result<StoreDescriptor, ConfigError> {
		let _guard = self.mutation.lock();
		let source = self.owning_source(id)?;
		log::info!("removing tile store {id:?} from {}", source.identifier());
		let removed = source.remove(id)?;
		self.notify(|listener| listener.on_remove(&removed))?;
		Ok(removed)
	}

	/// Replaces the descriptor with the same id in its owning source.
	pub fn modify(&self, descriptor: StoreDescriptor) -> Result<(), ConfigError> {
		let _guard = self.mutation.lock();
		let source = self.owning_source(&descriptor.id)?;
		source.modify(descriptor.clone())?;
		self.notify(|listener| listener.on_modify(&descriptor))
	}

	/// Renames a descriptor in place; the new id must be free across every
	/// source.
	pub fn rename(&self, old_id: &str, new_id: &str) -> Result<(), ConfigError> {
		let _guard = self.mutation.lock();
		if new_id.is_empty() {
			return Err(ConfigError::EmptyId);
		}
		if new_id == DEFAULT_SLOT_ID {
			return Err(ConfigError::ReservedId(new_id.to_string()));
		}
		if self.contains(new_id) {
			return Err(ConfigError::DuplicateId(new_id.to_string()));
		}
		let source = self.owning_source(old_id)?;
		log::info!("renaming tile store {old_id:?} to {new_id:?} in {}", source.identifier());
		source.rename(old_id, new_id)?;
		let renamed = source.get(new_id).ok_or_else(|| ConfigError::NotFound(new_id.to_string()))?;
		self.notify(|listener| listener.on_rename(old_id, &renamed))
	}

	fn owning_source(&self, id: &str) -> Result<&Arc<dyn ConfigSource>, ConfigError> {
		self
			.sources
			.iter()
			.find(|source| source.contains(id))
			.ok_or_else(|| ConfigError::NotFound(id.to_string()))
	}

	fn notify(&self, deliver: impl FnMut(&(dyn ConfigListener + 'static)) -> Result<(), ConfigError>) -> Result<(), ConfigError> {
		self
			.listeners
			.safe_for_each(deliver)
			.map_err(|error| ConfigError::ListenerFailure(error.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::MemoryConfigSource;
	use parking_lot::Mutex as PlMutex;
	use pretty_assertions::assert_eq;

	fn registry_with(sources: Vec<Arc<dyn ConfigSource>>) -> StoreRegistry {
		StoreRegistry::new(sources)
	}

	#[derive(Default)]
	struct Recorder {
		events: PlMutex<Vec<String>>,
	}

	impl ConfigListener for Recorder {
		fn on_add(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
			self.events.lock().push(format!("add {}", descriptor.id));
			Ok(())
		}

		fn on_remove(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
			self.events.lock().push(format!("remove {}", descriptor.id));
			Ok(())
		}

		fn on_modify(&self, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
			self.events.lock().push(format!("modify {}", descriptor.id));
			Ok(())
		}

		fn on_rename(&self, old_id: &str, descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
			self.events.lock().push(format!("rename {old_id}->{}", descriptor.id));
			Ok(())
		}
	}

	#[test]
	fn descriptors_merge_in_source_order() {
		let registry = registry_with(vec![
			Arc::new(MemoryConfigSource::new("one", vec![StoreDescriptor::memory("a")])),
			Arc::new(MemoryConfigSource::new("two", vec![StoreDescriptor::memory("b")])),
		]);
		let ids: Vec<String> = registry.descriptors().into_iter().map(|d| d.id).collect();
		assert_eq!(ids, vec!["a", "b"]);
	}

	#[test]
	fn add_skips_sources_that_can_not_persist() {
		let read_only = Arc::new(MemoryConfigSource::new_read_only("ro", vec![]));
		let writable = Arc::new(MemoryConfigSource::new("rw", vec![]));
		let registry = registry_with(vec![read_only.clone(), writable.clone()]);

		registry.add(StoreDescriptor::memory("a")).unwrap();
		assert!(!read_only.contains("a"));
		assert!(writable.contains("a"));
	}

	#[test]
	fn add_fails_when_nothing_persists() {
		let registry = registry_with(vec![Arc::new(MemoryConfigSource::new_read_only("ro", vec![]))]);
		assert!(matches!(
			registry.add(StoreDescriptor::memory("a")),
			Err(ConfigError::Unpersistable(_))
		));
	}

	#[test]
	fn add_rejects_empty_and_duplicate_ids() {
		let registry = registry_with(vec![
			Arc::new(MemoryConfigSource::new_read_only("ro", vec![StoreDescriptor::memory("a")])),
			Arc::new(MemoryConfigSource::new("rw", vec![])),
		]);
		assert!(matches!(registry.add(StoreDescriptor::memory("")), Err(ConfigError::EmptyId)));
		// "a" lives in the read-only source, but is still taken
		assert!(matches!(
			registry.add(StoreDescriptor::memory("a")),
			Err(ConfigError::DuplicateId(_))
		));
	}

	#[test]
	fn reserved_id_is_rejected_before_anything_persists() {
		let source = Arc::new(MemoryConfigSource::new("mem", vec![StoreDescriptor::memory("a")]));
		let registry = registry_with(vec![source.clone()]);

		assert!(matches!(
			registry.add(StoreDescriptor::memory(crate::DEFAULT_SLOT_ID)),
			Err(ConfigError::ReservedId(_))
		));
		assert!(!source.contains(crate::DEFAULT_SLOT_ID));

		assert!(matches!(
			registry.rename("a", crate::DEFAULT_SLOT_ID),
			Err(ConfigError::ReservedId(_))
		));
		assert!(source.contains("a"));
	}

	#[test]
	fn mutations_route_to_the_owning_source() {
		let one = Arc::new(MemoryConfigSource::new("one", vec![StoreDescriptor::memory("a")]));
		let two = Arc::new(MemoryConfigSource::new("two", vec![StoreDescriptor::memory("b")]));
		let registry = registry_with(vec![one.clone(), two.clone()]);

		registry.modify(StoreDescriptor::memory("b").with_enabled(false)).unwrap();
		assert!(!two.get("b").unwrap().enabled);

		assert_eq!(registry.remove("b").unwrap(), StoreDescriptor::memory("b").with_enabled(false));
		assert!(!registry.contains("b"));
		assert!(matches!(registry.remove("b"), Err(ConfigError::NotFound(_))));
	}

	#[test]
	fn rename_rejects_collisions_across_sources() {
		let registry = registry_with(vec![
			Arc::new(MemoryConfigSource::new("one", vec![StoreDescriptor::memory("a")])),
			Arc::new(MemoryConfigSource::new("two", vec![StoreDescriptor::memory("b")])),
		]);
		assert!(matches!(registry.rename("a", "b"), Err(ConfigError::DuplicateId(_))));
		registry.rename("a", "c").unwrap();
		assert!(registry.contains("c"));
	}

	#[test]
	fn listeners_see_every_mutation() {
		let registry = registry_with(vec![Arc::new(MemoryConfigSource::new("mem", vec![]))]);
		let recorder = Arc::new(Recorder::default());
		registry.add_listener(recorder.clone());

		registry.add(StoreDescriptor::memory("a")).unwrap();
		registry.modify(StoreDescriptor::memory("a").with_enabled(false)).unwrap();
		registry.rename("a", "b").unwrap();
		registry.remove("b").unwrap();

		assert_eq!(
			*recorder.events.lock(),
			vec!["add a", "modify a", "rename a->b", "remove b"]
		);
	}

	#[test]
	fn listener_failure_surfaces_after_the_mutation_applied() {
		struct Failing;
		impl ConfigListener for Failing {
			fn on_add(&self, _descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
				Err(ConfigError::ListenerFailure("router rejected it".to_string()))
			}
			fn on_remove(&self, _descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
				Ok(())
			}
			fn on_modify(&self, _descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
				Ok(())
			}
			fn on_rename(&self, _old_id: &str, _descriptor: &StoreDescriptor) -> Result<(), ConfigError> {
				Ok(())
			}
		}

		let registry = registry_with(vec![Arc::new(MemoryConfigSource::new("mem", vec![]))]);
		registry.add_listener(Arc::new(Failing));

		let result = registry.add(StoreDescriptor::memory("a"));
		assert!(matches!(result, Err(ConfigError::ListenerFailure(_))));
		// the descriptor was persisted before the listener ran
		assert!(registry.contains("a"));
	}

	#[test]
	fn removed_listener_is_silent() {
		let registry = registry_with(vec![Arc::new(MemoryConfigSource::new("mem", vec![]))]);
		let recorder = Arc::new(Recorder::default());
		registry.add_listener(recorder.clone());
		let handle: Arc<dyn ConfigListener> = recorder.clone();
		assert!(registry.remove_listener(&handle));

		registry.add(StoreDescriptor::memory("a")).unwrap();
		assert!(recorder.events.lock().is_empty());
	}
}
