//! Error taxonomy of the storage engine.
//!
//! - [`StoreError`] — backend I/O or resolution failure; recoverable by
//!   retrying or falling back.
//! - [`ConfigError`] — structural invariant violation at configuration
//!   time; always rejects the mutation before any state changes, with two
//!   exceptions carrying their own contract: `Persistence` is raised only
//!   after the in-memory state has been rolled back, and `ListenerFailure`
//!   is raised only after the mutation has been durably applied.

use crate::store::StorageState;
use thiserror::Error;

/// Backend I/O or store-resolution failure.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A layer referenced a store id that is not configured.
	#[error("no tile store with id {0:?} found")]
	NoSuchStore(String),

	/// The resolved store exists but is disabled.
	#[error("attempted to use tile store {0:?} which is disabled")]
	StoreDisabled(String),

	/// The reserved default slot is empty.
	#[error("no default tile store has been defined")]
	NoDefaultStore,

	/// A new store's underlying persistence failed the suitability check.
	#[error("tile store {id:?} is unsuitable: storage is {state}")]
	UnsuitableStorage { id: String, state: StorageState },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// A backend-specific operation failure.
	#[error("backend error: {0}")]
	Backend(String),

	/// A configuration failure surfaced through a storage API.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Structural configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("no id provided for tile store descriptor")]
	EmptyId,

	#[error("duplicate tile store id {0:?}")]
	DuplicateId(String),

	#[error("{0:?} is a reserved identifier and can not be used as a store id")]
	ReservedId(String),

	#[error("duplicate default tile store: {0:?} and {1:?}")]
	DuplicateDefault(String, String),

	#[error("the default tile store {0:?} can not be disabled")]
	DisabledDefault(String),

	#[error("no tile store descriptor with id {0:?} found")]
	NotFound(String),

	#[error("no configuration source is able to persist descriptor {0:?}")]
	Unpersistable(String),

	/// Persisting a well-formed mutation failed; the in-memory state was
	/// rolled back before this error was raised.
	#[error("failed to persist configuration: {reason}")]
	Persistence { reason: String },

	/// Creating or replacing a live store instance failed.
	#[error("failed to (re)create tile store {id:?}")]
	StoreFailure {
		id: String,
		#[source]
		source: Box<StoreError>,
	},

	/// One or more configuration listeners failed after the mutation was
	/// durably applied.
	#[error("configuration change applied, but listeners failed: {0}")]
	ListenerFailure(String),
}
