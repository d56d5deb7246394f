//! A bounded, short-TTL, read-once memory cache.
//!
//! The transient cache bridges the gap between a tile being rendered and the
//! same request arriving again moments later, before the backend write is
//! visible. It is bounded by entry count and by total payload bytes, evicts
//! oldest-first, and hands every entry out **at most once**: `get` removes
//! the entry whether it hits or misses.
//!
//! The cache is not internally synchronized; callers wrap each call in
//! their own critical section.

use crate::Blob;
use indexmap::IndexMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pluggable time source, injected for deterministic tests.
pub trait Ticker: Send {
	fn now_millis(&self) -> u64;
}

/// Wall-clock [`Ticker`] used by default.
pub struct SystemTicker;

impl Ticker for SystemTicker {
	fn now_millis(&self) -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or(0)
	}
}

struct CacheEntry {
	blob: Blob,
	inserted_at: u64,
}

/// An insertion-ordered cache of tile payloads, bounded by entry count and
/// total bytes, with a fixed time-to-live per entry.
pub struct TransientCache {
	entries: IndexMap<String, CacheEntry>,
	max_entries: usize,
	max_storage_bytes: u64,
	expire_millis: u64,
	storage_bytes: u64,
	ticker: Box<dyn Ticker>,
}

impl TransientCache {
	/// Creates a cache bounded to `max_entries` entries and
	/// `max_storage_kib` KiB of payload, with entries valid for
	/// `expire_millis` milliseconds.
	pub fn new(max_entries: usize, max_storage_kib: u64, expire_millis: u64) -> TransientCache {
		TransientCache {
			entries: IndexMap::new(),
			max_entries,
			max_storage_bytes: max_storage_kib * 1024,
			expire_millis,
			storage_bytes: 0,
			ticker: Box::new(SystemTicker),
		}
	}

	/// Replaces the time source. Entries keep their recorded insertion
	/// times.
	pub fn set_ticker(&mut self, ticker: Box<dyn Ticker>) {
		self.ticker = ticker;
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Total payload bytes currently cached.
	pub fn storage_bytes(&self) -> u64 {
		self.storage_bytes
	}

	/// Stores `blob` under `key` and evicts oldest-first until both the
	/// entry and byte bounds hold. Re-putting an existing key replaces the
	/// payload without refreshing the key's eviction position.
	pub fn put(&mut self, key: &str, blob: Blob) {
		let entry = CacheEntry {
			inserted_at: self.ticker.now_millis(),
			blob,
		};
		self.storage_bytes += entry.blob.len();
		if let Some(previous) = self.entries.insert(key.to_string(), entry) {
			self.storage_bytes -= previous.blob.len();
		}
		self.evict();
	}

	/// Takes the entry for `key`, returning its payload only when the entry
	/// is still within its time-to-live.
	///
	/// The entry is removed in every case, so a payload can be read at most
	/// once per insertion; a second `get` for the same key always misses.
	pub fn get(&mut self, key: &str) -> Option<Blob> {
		let entry = self.entries.shift_remove(key)?;
		self.storage_bytes -= entry.blob.len();
		let age = self.ticker.now_millis().saturating_sub(entry.inserted_at);
		if age < self.expire_millis {
			Some(entry.blob)
		} else {
			log::trace!("transient entry {key:?} expired ({age} ms old)");
			None
		}
	}

	fn evict(&mut self) {
		while self.entries.len() > self.max_entries || self.storage_bytes > self.max_storage_bytes {
			let Some((key, entry)) = self.entries.shift_remove_index(0) else {
				return;
			};
			self.storage_bytes -= entry.blob.len();
			log::trace!("transient entry {key:?} evicted");
		}
	}
}
