//! Tile-aligned coverage rectangles for a single zoom level.
//!
//! A `TileBounds` describes a rectangular region of tiles as inclusive
//! minimum and maximum coordinates. It is the per-level building block of
//! [`TileRange`](crate::TileRange) coverage maps and of raster mask
//! coverage pyramids.
//!
//! ```
//! use tilevault_core::TileBounds;
//!
//! let bounds = TileBounds::new(2, 1, 5, 4).unwrap();
//! assert_eq!(bounds.width(), 4);
//! assert_eq!(bounds.height(), 4);
//! assert!(bounds.contains(3, 2));
//! ```

use anyhow::{Result, ensure};
use std::fmt::{self, Debug};

/// A rectangular region of tiles with inclusive bounds on both axes.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct TileBounds {
	pub min_x: u64,
	pub min_y: u64,
	pub max_x: u64,
	pub max_y: u64,
}

impl TileBounds {
	/// Creates bounds from inclusive minimum and maximum tile coordinates.
	///
	/// # Errors
	/// Returns an error if a minimum exceeds its maximum.
	pub fn new(min_x: u64, min_y: u64, max_x: u64, max_y: u64) -> Result<TileBounds> {
		ensure!(min_x <= max_x, "min_x ({min_x}) must be <= max_x ({max_x})");
		ensure!(min_y <= max_y, "min_y ({min_y}) must be <= max_y ({max_y})");
		Ok(TileBounds {
			min_x,
			min_y,
			max_x,
			max_y,
		})
	}

	/// Full coverage of a zoom level: `2^z × 2^z` tiles.
	pub fn full_level(z: u8) -> TileBounds {
		let max = (1u64 << z) - 1;
		TileBounds {
			min_x: 0,
			min_y: 0,
			max_x: max,
			max_y: max,
		}
	}

	/// Width in tiles (inclusive bounds).
	pub fn width(&self) -> u64 {
		self.max_x - self.min_x + 1
	}

	/// Height in tiles (inclusive bounds).
	pub fn height(&self) -> u64 {
		self.max_y - self.min_y + 1
	}

	/// Number of tiles covered.
	pub fn count_tiles(&self) -> u64 {
		self.width() * self.height()
	}

	pub fn contains(&self, x: u64, y: u64) -> bool {
		x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
	}

	/// Intersection of two rectangles, or `None` when they are disjoint.
	pub fn intersection(&self, other: &TileBounds) -> Option<TileBounds> {
		let min_x = self.min_x.max(other.min_x);
		let min_y = self.min_y.max(other.min_y);
		let max_x = self.max_x.min(other.max_x);
		let max_y = self.max_y.min(other.max_y);
		if min_x > max_x || min_y > max_y {
			return None;
		}
		Some(TileBounds {
			min_x,
			min_y,
			max_x,
			max_y,
		})
	}

	/// Grows the rectangle to include the given tile.
	pub fn include(&mut self, x: u64, y: u64) {
		self.min_x = self.min_x.min(x);
		self.min_y = self.min_y.min(y);
		self.max_x = self.max_x.max(x);
		self.max_y = self.max_y.max(y);
	}

	/// The same region one zoom level lower (coordinates halved).
	pub fn scaled_down(&self) -> TileBounds {
		TileBounds {
			min_x: self.min_x / 2,
			min_y: self.min_y / 2,
			max_x: self.max_x / 2,
			max_y: self.max_y / 2,
		}
	}
}

impl Debug for TileBounds {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"TileBounds[{},{},{},{}]",
			self.min_x, self.min_y, self.max_x, self.max_y
		)
	}
}
