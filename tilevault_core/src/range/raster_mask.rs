//! A per-zoom-level bitmask over a tile coverage.
//!
//! A `RasterMask` answers "is tile (x, y, z) part of this job?" for sparse,
//! non-rectangular coverages (for example, tiles touched by a geometry).
//! Masks are usually rendered only up to a moderate zoom level; lookups
//! above the top masked level are answered by proportionally downsampling
//! the requested coordinate into the top masked grid.
//!
//! Grid pixels use image orientation: row 0 is the top row, while tile
//! coordinates grow upwards. [`RasterMask::lookup`] performs the flip.

use crate::{BitGrid, TileBounds};

/// Per-level bit rasters plus per-level coverage rectangles.
///
/// The number of zoom levels is the length of `coverage`; `grids` may be
/// shorter, in which case lookups above the top masked level downsample to
/// it. Each coverage rectangle may describe a smaller area than its grid,
/// which spans the layer's whole tile range at that level.
pub struct RasterMask {
	grids: Vec<BitGrid>,
	coverage: Vec<TileBounds>,
	max_grid_level: u8,
}

impl RasterMask {
	/// # Panics
	/// Panics when `grids` is empty or has more levels than `coverage`.
	pub fn new(grids: Vec<BitGrid>, coverage: Vec<TileBounds>) -> RasterMask {
		assert!(!grids.is_empty(), "a raster mask needs at least one grid");
		assert!(
			grids.len() <= coverage.len(),
			"coverage must describe every masked level"
		);
		let max_grid_level = (grids.len() - 1) as u8;
		RasterMask {
			grids,
			coverage,
			max_grid_level,
		}
	}

	/// Coverage rectangles, one per zoom level.
	pub fn coverage(&self) -> &[TileBounds] {
		&self.coverage
	}

	/// Highest zoom level that carries its own grid.
	pub fn max_grid_level(&self) -> u8 {
		self.max_grid_level
	}

	/// Whether tile `(x, y)` at zoom `z` is set in the mask.
	///
	/// Levels above the top masked grid are answered by scaling the
	/// coordinate into the top grid's coverage; coordinates outside the
	/// level's coverage rectangle or the grid's pixel bounds are `false`.
	pub fn lookup(&self, x: u64, y: u64, z: u8) -> bool {
		let Some(coverage) = self.coverage.get(z as usize) else {
			return false;
		};
		if !coverage.contains(x, y) {
			return false;
		}

		let (x, y, z) = if z > self.max_grid_level {
			// downsample into the top masked level
			let requested = &self.coverage[z as usize];
			let masked = &self.coverage[self.max_grid_level as usize];
			let scale_x = (masked.max_x - masked.min_x) as f64 / (requested.max_x - requested.min_x) as f64;
			let scale_y = (masked.max_y - masked.min_y) as f64 / (requested.max_y - requested.min_y) as f64;
			(
				(x as f64 * scale_x).round() as u64,
				(y as f64 * scale_y).round() as u64,
				self.max_grid_level,
			)
		} else {
			(x, y, z)
		};

		self.sample(x, y, z)
	}

	fn sample(&self, x: u64, y: u64, z: u8) -> bool {
		if !self.coverage[z as usize].contains(x, y) {
			return false;
		}
		let grid = &self.grids[z as usize];
		if x >= u64::from(grid.width()) || y >= u64::from(grid.height()) {
			// coverage may include meta-tiling factors the grid doesn't
			return false;
		}
		// tile rows grow upwards, grid rows downwards
		let row = u64::from(grid.height()) - 1 - y;
		grid.get(x as u32, row as u32)
	}
}
