//! The `TileCoord` structure, representing one tile address within a grid
//! set: column `x`, row `y`, and zoom level `z`.
//!
//! # Examples
//!
//! ```
//! use tilevault_core::TileCoord;
//!
//! let coord = TileCoord::new(4, 6, 7);
//! assert_eq!(coord.x, 6);
//! assert_eq!(coord.y, 7);
//! assert_eq!(coord.z, 4);
//! ```

use std::fmt::{self, Debug};

/// A tile address at a specific zoom level. Immutable value type with
/// structural equality.
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub x: u64,
	pub y: u64,
	pub z: u8,
}

impl TileCoord {
	pub fn new(z: u8, x: u64, y: u64) -> TileCoord {
		TileCoord { x, y, z }
	}

	/// Row-major index within the level, used for stable ordering across a
	/// whole zoom pyramid.
	pub fn sort_index(&self) -> u128 {
		let size = 1u128 << self.z;
		let offset = (size * size - 1) / 3;
		offset + size * u128::from(self.y) + u128::from(self.x)
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "TileCoord({}, {}, {})", self.z, self.x, self.y)
	}
}

impl fmt::Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}/{}/{}", self.z, self.x, self.y)
	}
}
