//! A shared cursor over a [`TileRange`], stepping in meta-tile units.
//!
//! Bulk seed and truncate jobs run many worker threads against one
//! `RangeIterator`; each `next()` call atomically claims one meta-tile
//! location, so no location is handed out twice and none is lost. The
//! iterator walks x fastest, then y, then zoom level, exactly in the order
//! the locations are produced.

use crate::{RasterMask, TileBounds, TileCoord, TileRange};
use anyhow::{Result, ensure};
use itertools::Itertools;
use parking_lot::Mutex;
use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

struct Cursor {
	x: u64,
	y: u64,
	z: u8,
	done: bool,
}

/// A stateful, thread-shareable meta-tile cursor, optionally filtered by a
/// [`RasterMask`].
///
/// The bounds of the tile range must already be expanded to the meta-tiling
/// factors for the clamped tile counts to be exact.
pub struct RangeIterator {
	range: TileRange,
	mask: Option<Arc<RasterMask>>,
	meta_x: u64,
	meta_y: u64,
	cursor: Mutex<Cursor>,
	tiles_accepted: AtomicU64,
	tiles_skipped: AtomicU64,
}

impl RangeIterator {
	/// # Errors
	/// Returns an error when a meta-tiling factor is zero.
	pub fn new(range: TileRange, meta_x: u64, meta_y: u64, mask: Option<Arc<RasterMask>>) -> Result<RangeIterator> {
		ensure!(meta_x > 0 && meta_y > 0, "meta-tiling factors must be > 0");
		let start = *range.bounds_of(range.zoom_start)?;
		Ok(RangeIterator {
			mask,
			meta_x,
			meta_y,
			cursor: Mutex::new(Cursor {
				x: start.min_x,
				y: start.min_y,
				z: range.zoom_start,
				done: false,
			}),
			tiles_accepted: AtomicU64::new(0),
			tiles_skipped: AtomicU64::new(0),
			range,
		})
	}

	pub fn range(&self) -> &TileRange {
		&self.range
	}

	/// Tiles covered by accepted meta-tile locations so far.
	pub fn tiles_accepted(&self) -> u64 {
		self.tiles_accepted.load(Ordering::Relaxed)
	}

	/// Tiles covered by mask-rejected meta-tile locations so far.
	pub fn tiles_skipped(&self) -> u64 {
		self.tiles_skipped.load(Ordering::Relaxed)
	}

	/// Claims the next meta-tile location, or `None` once the range is
	/// exhausted (and on every call after that).
	///
	/// The claim-and-advance runs under a single lock, so concurrent
	/// workers each receive a distinct location.
	pub fn next_location(&self) -> Option<TileCoord> {
		let mut cursor = self.cursor.lock();
		loop {
			if cursor.done {
				return None;
			}
			// bounds were validated at construction
			let bounds = *self.range.bounds_of(cursor.z).ok()?;
			let candidate = TileCoord::new(cursor.z, cursor.x, cursor.y);
			self.advance(&mut cursor, &bounds);

			let covered = self.tiles_for_location(&candidate, &bounds);
			if self.accepts(&candidate) {
				self.tiles_accepted.fetch_add(covered, Ordering::Relaxed);
				return Some(candidate);
			}
			self.tiles_skipped.fetch_add(covered, Ordering::Relaxed);
		}
	}

	fn advance(&self, cursor: &mut Cursor, bounds: &TileBounds) {
		cursor.x += self.meta_x;
		if cursor.x <= bounds.max_x {
			return;
		}
		cursor.y += self.meta_y;
		if cursor.y <= bounds.max_y {
			cursor.x = bounds.min_x;
			return;
		}
		if cursor.z >= self.range.zoom_stop {
			cursor.done = true;
			return;
		}
		cursor.z += 1;
		if let Ok(next) = self.range.bounds_of(cursor.z) {
			cursor.x = next.min_x;
			cursor.y = next.min_y;
		} else {
			cursor.done = true;
		}
	}

	/// Number of tiles the meta-tile at `loc` covers, clamped to the level
	/// bounds.
	fn tiles_for_location(&self, loc: &TileCoord, bounds: &TileBounds) -> u64 {
		let spread_x = self.meta_x.min(bounds.max_x - loc.x + 1);
		let spread_y = self.meta_y.min(bounds.max_y - loc.y + 1);
		spread_x * spread_y
	}

	/// A masked location is accepted iff at least one of the sub-tiles its
	/// meta-tile covers is set in the mask.
	fn accepts(&self, loc: &TileCoord) -> bool {
		let Some(mask) = &self.mask else {
			return true;
		};
		(0..self.meta_y)
			.cartesian_product(0..self.meta_x)
			.any(|(dy, dx)| mask.lookup(loc.x + dx, loc.y + dy, loc.z))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{BitGrid, TileRange};
	use std::collections::HashSet;
	use std::thread;

	fn collect(iter: &RangeIterator) -> Vec<TileCoord> {
		let mut out = Vec::new();
		while let Some(loc) = iter.next_location() {
			out.push(loc);
		}
		out
	}

	#[test]
	fn meta_tiling_walks_levels_without_repeats() {
		// level 0 bounds (0,0,1,1) with 2x2 meta-tiling: one location
		// covering 4 tiles, then level 1
		let mut bounds = std::collections::BTreeMap::new();
		bounds.insert(0, TileBounds::new(0, 0, 1, 1).unwrap());
		bounds.insert(1, TileBounds::new(0, 0, 1, 1).unwrap());
		let range = TileRange::new("osm", "grid", "png", "default", 0, 1, bounds).unwrap();
		let iter = RangeIterator::new(range, 2, 2, None).unwrap();

		let first = iter.next_location().unwrap();
		assert_eq!(first, TileCoord::new(0, 0, 0));
		assert_eq!(iter.tiles_accepted(), 4);

		let second = iter.next_location().unwrap();
		assert_eq!(second, TileCoord::new(1, 0, 0));
		assert_eq!(iter.next_location(), None);
		assert_eq!(iter.next_location(), None);
	}

	#[test]
	fn walks_x_fastest_then_y_then_z() {
		let range = TileRange::full_levels("osm", "grid", "png", 1, 2).unwrap();
		let iter = RangeIterator::new(range, 1, 1, None).unwrap();
		let locations = collect(&iter);
		assert_eq!(locations.len(), 4 + 16);
		assert_eq!(locations[0], TileCoord::new(1, 0, 0));
		assert_eq!(locations[1], TileCoord::new(1, 1, 0));
		assert_eq!(locations[2], TileCoord::new(1, 0, 1));
		assert_eq!(locations[4], TileCoord::new(2, 0, 0));
		let unique: HashSet<_> = locations.iter().copied().collect();
		assert_eq!(unique.len(), locations.len());
		assert_eq!(iter.tiles_accepted(), 20);
	}

	#[test]
	fn clamps_tile_counts_at_level_edges() {
		// 3x3 level with 2x2 meta-tiles: corner meta-tile covers only 1
		let mut bounds = std::collections::BTreeMap::new();
		bounds.insert(0, TileBounds::new(0, 0, 2, 2).unwrap());
		let range = TileRange::new("osm", "grid", "png", "default", 0, 0, bounds).unwrap();
		let iter = RangeIterator::new(range, 2, 2, None).unwrap();
		let locations = collect(&iter);
		assert_eq!(locations.len(), 4);
		assert_eq!(iter.tiles_accepted(), 9);
	}

	#[test]
	fn mask_skips_unset_locations() {
		// only tile (0, 0) of a 4x4 level-2 coverage is set; grid row 3 is
		// the bottom row
		let mut grid = BitGrid::new(4, 4);
		grid.set(0, 3);
		let coverage = vec![
			TileBounds::full_level(0),
			TileBounds::full_level(1),
			TileBounds::full_level(2),
		];
		let mask = RasterMask::new(
			vec![BitGrid::new(1, 1), BitGrid::new(2, 2), grid],
			coverage,
		);

		let mut bounds = std::collections::BTreeMap::new();
		bounds.insert(2, TileBounds::full_level(2));
		let range = TileRange::new("osm", "grid", "png", "default", 2, 2, bounds).unwrap();
		let iter = RangeIterator::new(range, 2, 2, Some(Arc::new(mask))).unwrap();

		let locations = collect(&iter);
		// the meta-tile at (0,0) covers the set tile; the other three don't
		assert_eq!(locations, vec![TileCoord::new(2, 0, 0)]);
		assert_eq!(iter.tiles_accepted(), 4);
		assert_eq!(iter.tiles_skipped(), 12);
	}

	#[test]
	fn concurrent_workers_claim_distinct_locations() {
		let range = TileRange::full_levels("osm", "grid", "png", 3, 3).unwrap();
		let iter = Arc::new(RangeIterator::new(range, 1, 1, None).unwrap());

		let mut handles = Vec::new();
		for _ in 0..4 {
			let iter = iter.clone();
			handles.push(thread::spawn(move || {
				let mut seen = Vec::new();
				while let Some(loc) = iter.next_location() {
					seen.push(loc);
				}
				seen
			}));
		}
		let mut all = Vec::new();
		for handle in handles {
			all.extend(handle.join().unwrap());
		}
		assert_eq!(all.len(), 64);
		let unique: HashSet<_> = all.into_iter().collect();
		assert_eq!(unique.len(), 64);
		assert_eq!(iter.tiles_accepted(), 64);
	}
}
