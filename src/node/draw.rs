use image::RgbImage;

use super::error::DrawError;
use super::region::Region;

impl super::QuadtreeNode {
	/// Draws this node's leaves into `img`.
	///
	/// Every leaf paints its color over its whole region; branch nodes
	/// recurse into their subnodes (top-left, top-right, bottom-left,
	/// bottom-right). Absent subnodes cover no pixels and are skipped.
	///
	/// Returns an `Err` if a leaf doesn't fit inside `img`, which can only
	/// happen when drawing into a buffer the tree wasn't built for. Leaves
	/// visited before the bad one have already been drawn.
	pub fn draw(&self, img: &mut RgbImage) -> Result<(), DrawError> {
		match self.sections {
			None => {
				if !self.region.fits_within(img.width(), img.height()) {
					return Err(DrawError::InvalidRegion {
						region: self.region,
						width: img.width(),
						height: img.height(),
					});
				}
				self.fill(img, self.region);
				Ok(())
			},
			Some(ref sects) => {
				for section in sects.iter().flatten() {
					section.draw(img)?;
				}
				Ok(())
			},
		}
	}

	/// Paints `region` with this node's color. The region must fit in `img`.
	pub(crate) fn fill(&self, img: &mut RgbImage, region: Region) {
		let stride = img.width() as usize * 3;
		let raw: &mut [u8] = &mut *img;
		for row in region.y as usize..(region.y + region.height) as usize {
			let start = row * stride + region.x as usize * 3;
			for px in raw[start..start + region.width as usize * 3].chunks_exact_mut(3) {
				px.copy_from_slice(&self.color.0);
			}
		}
	}

	/// Draws leaves without bounds checks; the caller vouches for `img`.
	fn paint(&self, img: &mut RgbImage) {
		match self.sections {
			None => self.fill(img, self.region),
			Some(ref sects) => sects.iter().flatten().for_each(|s| s.paint(img)),
		}
	}
}

impl super::Quadtree {
	/// Rasterizes the tree back into an image of the original dimensions.
	///
	/// The leaves of a built tree tile the image exactly, so every output
	/// pixel is written once.
	pub fn reconstruct(&self) -> RgbImage {
		let mut img = RgbImage::new(self.width(), self.height());
		if let Some(root) = self.root() {
			root.paint(&mut img);
		}
		img
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::metric::ErrorMetric;
	use crate::node::{BuildParams, Quadtree, QuadtreeNode};

	#[test]
	fn threshold_zero_is_lossless() {
		let img = RgbImage::from_fn(7, 5, |x, y| image::Rgb([(x * 31) as u8, (y * 47) as u8, (x ^ y) as u8]));
		let params = BuildParams::new(ErrorMetric::Variance, 0., 1).unwrap();
		assert_eq!(Quadtree::from_image(&img, &params).reconstruct(), img);
	}

	#[test]
	fn leaf_paints_average() {
		let img = RgbImage::from_fn(2, 2, |x, _| image::Rgb([x as u8 * 100, 0, 0]));
		let params = BuildParams::new(ErrorMetric::MaxPixelDifference, 255., 1).unwrap();
		let out = Quadtree::from_image(&img, &params).reconstruct();
		assert!(out.pixels().all(|p| *p == image::Rgb([50, 0, 0])));
	}

	#[test]
	fn draw_rejects_small_buffer() {
		let node = QuadtreeNode {
			region: Region::new(2, 2, 3, 3),
			color: image::Rgb([1, 2, 3]),
			sections: None,
		};
		let mut small = RgbImage::new(4, 4);
		assert!(matches!(node.draw(&mut small), Err(DrawError::InvalidRegion { .. })));
		let mut big = RgbImage::new(5, 5);
		node.draw(&mut big).unwrap();
		assert_eq!(*big.get_pixel(4, 4), image::Rgb([1, 2, 3]));
		assert_eq!(*big.get_pixel(1, 1), image::Rgb([0, 0, 0]));
	}
}
