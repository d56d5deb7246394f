//! The `TileRange` structure: a zoom interval with per-level coverage
//! bounds, identifying a set of tiles of one layer/grid-set/format/parameter
//! variant for bulk operations.

use crate::{TileBounds, types::parameters::EMPTY_PARAMETERS_ID};
use anyhow::{Result, anyhow, ensure};
use std::collections::BTreeMap;

/// A (possibly sparse) rectangular tile coverage over a zoom interval.
///
/// Every zoom level in `zoom_start..=zoom_stop` carries its own coverage
/// rectangle; construction rejects ranges with missing levels so that
/// [`TileRange::bounds_of`] never has to guess.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TileRange {
	pub layer: String,
	pub gridset: String,
	pub format: String,
	pub parameters_id: String,
	pub zoom_start: u8,
	pub zoom_stop: u8,
	bounds: BTreeMap<u8, TileBounds>,
}

impl TileRange {
	/// # Errors
	/// Returns an error if `zoom_start > zoom_stop` or if `bounds` lacks an
	/// entry for any level of the interval.
	pub fn new(
		layer: &str,
		gridset: &str,
		format: &str,
		parameters_id: &str,
		zoom_start: u8,
		zoom_stop: u8,
		bounds: BTreeMap<u8, TileBounds>,
	) -> Result<TileRange> {
		ensure!(
			zoom_start <= zoom_stop,
			"zoom_start ({zoom_start}) must be <= zoom_stop ({zoom_stop})"
		);
		for z in zoom_start..=zoom_stop {
			ensure!(bounds.contains_key(&z), "missing bounds for zoom level {z}");
		}
		Ok(TileRange {
			layer: layer.to_string(),
			gridset: gridset.to_string(),
			format: format.to_string(),
			parameters_id: parameters_id.to_string(),
			zoom_start,
			zoom_stop,
			bounds,
		})
	}

	/// Range over full zoom levels, without request parameters. Convenience
	/// for tests and simple seeding jobs.
	pub fn full_levels(layer: &str, gridset: &str, format: &str, zoom_start: u8, zoom_stop: u8) -> Result<TileRange> {
		let bounds = (zoom_start..=zoom_stop).map(|z| (z, TileBounds::full_level(z))).collect();
		Self::new(
			layer,
			gridset,
			format,
			EMPTY_PARAMETERS_ID,
			zoom_start,
			zoom_stop,
			bounds,
		)
	}

	/// Coverage rectangle of one zoom level.
	///
	/// # Errors
	/// Returns an error when `z` lies outside `zoom_start..=zoom_stop`.
	pub fn bounds_of(&self, z: u8) -> Result<&TileBounds> {
		self
			.bounds
			.get(&z)
			.ok_or_else(|| anyhow!("zoom level {z} is outside of range {}..={}", self.zoom_start, self.zoom_stop))
	}

	/// Total number of tiles covered by all levels of the range.
	pub fn count_tiles(&self) -> u64 {
		(self.zoom_start..=self.zoom_stop)
			.filter_map(|z| self.bounds.get(&z))
			.map(TileBounds::count_tiles)
			.sum()
	}
}
