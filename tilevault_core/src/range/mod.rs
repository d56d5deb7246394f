//! Sparse-coverage iteration for bulk seeding and truncation: a per-level
//! bitmask ([`RasterMask`]) and a thread-shareable meta-tile cursor
//! ([`RangeIterator`]) that distributes work across parallel workers.

mod bit_grid;
mod iterator;
mod raster_mask;

pub use bit_grid::BitGrid;
pub use iterator::RangeIterator;
pub use raster_mask::RasterMask;
