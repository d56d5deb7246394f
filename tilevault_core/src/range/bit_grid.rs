//! A packed 2-D bit raster. Row 0 is the **top** row, matching the image
//! rasters these grids are typically rendered from.

/// A `width × height` raster of single-bit samples, packed into `u64` words.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitGrid {
	width: u32,
	height: u32,
	words: Vec<u64>,
}

impl BitGrid {
	/// Creates an all-zero grid.
	pub fn new(width: u32, height: u32) -> BitGrid {
		let bits = (width as usize) * (height as usize);
		BitGrid {
			width,
			height,
			words: vec![0u64; bits.div_ceil(64)],
		}
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	fn index(&self, x: u32, y: u32) -> (usize, u64) {
		let bit = (y as usize) * (self.width as usize) + (x as usize);
		(bit / 64, 1u64 << (bit % 64))
	}

	/// Sets the pixel at `(x, y)`.
	///
	/// # Panics
	/// Panics when the pixel lies outside the grid.
	pub fn set(&mut self, x: u32, y: u32) {
		assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
		let (word, mask) = self.index(x, y);
		self.words[word] |= mask;
	}

	/// Samples the pixel at `(x, y)`; out-of-bounds pixels read as `false`.
	pub fn get(&self, x: u32, y: u32) -> bool {
		if x >= self.width || y >= self.height {
			return false;
		}
		let (word, mask) = self.index(x, y);
		self.words[word] & mask != 0
	}
}
