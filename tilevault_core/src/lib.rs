//! Value types and backend-agnostic algorithms for the tilevault storage
//! engine: tile coordinates, bounds and ranges, the raster coverage mask and
//! its meta-tile iterator, the transient in-process cache, and the generic
//! listener fan-out.

pub mod cache;

pub mod listeners;

pub mod range;

pub mod types;

pub use cache::{SystemTicker, Ticker, TransientCache};
pub use listeners::{FanoutError, ListenerSet};
pub use range::{BitGrid, RangeIterator, RasterMask};
pub use types::{Blob, EMPTY_PARAMETERS_ID, TileBounds, TileCoord, TileKey, TileRange, parameters_id};
