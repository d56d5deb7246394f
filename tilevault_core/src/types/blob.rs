//! The [`Blob`] struct, a thin wrapper around [`Vec<u8>`] used for tile
//! payloads throughout the engine.
//!
//! ```
//! use tilevault_core::Blob;
//!
//! let blob = Blob::from(vec![1u8, 2, 3]);
//! assert_eq!(blob.len(), 3);
//! assert_eq!(blob.as_slice(), &[1, 2, 3]);
//! ```

use std::fmt::Debug;

/// An owned byte buffer holding one tile payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}
}

impl From<Vec<u8>> for Blob {
	fn from(value: Vec<u8>) -> Self {
		Blob(value)
	}
}

impl From<&[u8]> for Blob {
	fn from(value: &[u8]) -> Self {
		Blob(value.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(value: &str) -> Self {
		Blob(value.as_bytes().to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Blob").field("length", &self.0.len()).finish()
	}
}
