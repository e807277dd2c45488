use image::{Pixel, RgbImage};

/// A single color sample.
pub type Color = image::Rgb<u8>;

/// Rectangular area of an image, addressed by offset and extent.
///
/// Regions are never copied out of the image; every operation indexes
/// straight into the image's flat row-major buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl Region {
	pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Region { x, y, width, height }
	}

	/// The region covering all of `img`.
	pub fn whole(img: &RgbImage) -> Self {
		Region::new(0, 0, img.width(), img.height())
	}

	/// Pixel area. Computed in 64 bits so that it can't overflow.
	pub fn area(&self) -> u64 {
		self.width as u64 * self.height as u64
	}

	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// Whether the region lies inside an image of the given dimensions.
	pub fn fits_within(&self, width: u32, height: u32) -> bool {
		self.x as u64 + self.width as u64 <= width as u64 &&
			self.y as u64 + self.height as u64 <= height as u64
	}

	/// Splits the region into top-left, top-right, bottom-left and
	/// bottom-right quadrants.
	///
	/// The first half of each axis gets the floor of half the extent and
	/// the second half gets the remainder, so odd extents still tile the
	/// region exactly. Quadrants may have zero area.
	pub fn quadrants(&self) -> [Region; 4] {
		let half_w = self.width / 2;
		let rem_w = self.width - half_w;
		let half_h = self.height / 2;
		let rem_h = self.height - half_h;
		[
			Region::new(self.x, self.y, half_w, half_h),
			Region::new(self.x + half_w, self.y, rem_w, half_h),
			Region::new(self.x, self.y + half_h, half_w, rem_h),
			Region::new(self.x + half_w, self.y + half_h, rem_w, rem_h),
		]
	}

	/// Iterates over the pixels of the region in row-major order.
	///
	/// The region must fit within `img`.
	pub fn pixels<'a>(&self, img: &'a RgbImage) -> impl Iterator<Item = &'a Color> + 'a {
		let stride = img.width() as usize * 3;
		let (x, y) = (self.x as usize, self.y as usize);
		let row_len = self.width as usize * 3;
		let raw: &'a [u8] = img.as_raw();
		(y..y + self.height as usize).flat_map(move |row| {
			let start = row * stride + x * 3;
			raw[start..start + row_len].chunks_exact(3).map(Color::from_slice)
		})
	}

	/// Truncated per-channel mean of the region's pixels.
	///
	/// The region must have positive area.
	pub fn average_color(&self, img: &RgbImage) -> Color {
		let sums = self.pixels(img).fold([0u64; 3], |mut s, p| {
			s[0] += p.0[0] as u64;
			s[1] += p.0[1] as u64;
			s[2] += p.0[2] as u64;
			s
		});
		let total = self.area();
		image::Rgb([
			(sums[0] / total) as u8,
			(sums[1] / total) as u8,
			(sums[2] / total) as u8,
		])
	}
}

impl std::fmt::Display for Region {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{} at ({}, {})", self.width, self.height, self.x, self.y)
	}
}
