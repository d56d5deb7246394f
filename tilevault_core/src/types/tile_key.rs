//! The `TileKey` structure: the full addressable identity of a stored tile.
//!
//! Backends receive a `TileKey` for every tile operation; what they do with
//! it (file path, database row, object name) is their own concern. The only
//! rendering defined here is [`TileKey::cache_path`], the backend-neutral
//! key used by the transient cache.

use crate::{TileCoord, types::parameters::EMPTY_PARAMETERS_ID};
use std::fmt::{self, Debug};

/// Identity of a stored tile: layer, grid set, format, parameter digest and
/// coordinate. Structural equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
	pub layer: String,
	pub gridset: String,
	pub format: String,
	pub parameters_id: String,
	pub coord: TileCoord,
}

impl TileKey {
	pub fn new(layer: &str, gridset: &str, format: &str, parameters_id: &str, coord: TileCoord) -> TileKey {
		TileKey {
			layer: layer.to_string(),
			gridset: gridset.to_string(),
			format: format.to_string(),
			parameters_id: parameters_id.to_string(),
			coord,
		}
	}

	/// Key for a tile stored without request parameters.
	pub fn without_parameters(layer: &str, gridset: &str, format: &str, coord: TileCoord) -> TileKey {
		Self::new(layer, gridset, format, EMPTY_PARAMETERS_ID, coord)
	}

	/// Directory-path-shaped rendering of this key, independent of any
	/// backend's physical layout. Used as the transient-cache key.
	pub fn cache_path(&self) -> String {
		format!(
			"{}/{}/{}/{}/{}/{}.{}",
			self.layer, self.gridset, self.parameters_id, self.coord.z, self.coord.x, self.coord.y, self.format
		)
	}
}

impl Debug for TileKey {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "TileKey({})", self.cache_path())
	}
}
