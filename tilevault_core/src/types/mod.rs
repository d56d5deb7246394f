//! Core value types: tile coordinates, per-level bounds, tile identities and
//! ranges, the blob payload wrapper, and parameter digests.

mod blob;
mod parameters;
mod tile_bounds;
mod tile_coord;
mod tile_key;
mod tile_range;

pub use blob::Blob;
pub use parameters::{EMPTY_PARAMETERS_ID, parameters_id};
pub use tile_bounds::TileBounds;
pub use tile_coord::TileCoord;
pub use tile_key::TileKey;
pub use tile_range::TileRange;
