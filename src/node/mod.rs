pub mod error;
pub mod metric;
pub mod region;

use image::RgbImage;
use tracing::info;

use error::ParamError;
use metric::ErrorMetric;
use region::{Color, Region};

/// Node in a quadtree for storing an image.
///
/// May contain subnodes (branch node) or no subnodes and just a color
/// (leaf node).
///
/// Branch nodes keep the average color of their region too, so that
/// tree descent can stop at any level and give a meaningful preview.
/// A subnode is `None` when its quadrant has zero area, which happens
/// whenever a region one pixel wide or tall is split.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadtreeNode {
	pub region: Region,
	pub color: Color,
	pub sections: Option<Box<[Option<QuadtreeNode>; 4]>>,
}

/// Parameters controlling when a region stops being split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildParams {
	pub metric: ErrorMetric,
	/// Regions with an error below this become leaves.
	pub threshold: f64,
	/// Regions with a pixel area below this become leaves.
	pub min_block_size: u64,
}

impl BuildParams {
	/// Validates `threshold` against the metric's range and requires a
	/// positive `min_block_size`.
	pub fn new(metric: ErrorMetric, threshold: f64, min_block_size: u64) -> Result<Self, ParamError> {
		if min_block_size == 0 {
			return Err(ParamError::InvalidMinBlockSize);
		}
		let threshold = metric.validate_threshold(threshold)?;
		Ok(BuildParams { metric, threshold, min_block_size })
	}
}

impl QuadtreeNode {
	/// Builds the subtree for `region` of `img`.
	///
	/// Returns `None` for a region with zero area; such a region covers no
	/// pixels, so it is a normal way for recursion to end rather than an
	/// error. Otherwise the region becomes a leaf when its error is below
	/// `params.threshold`, its area is below `params.min_block_size`, or it
	/// is a single pixel, and is split into four quadrants if not.
	///
	/// Every split at least halves the longer side, so recursion depth is at
	/// most `ceil(log2(max(width, height))) + 1` regardless of parameters.
	///
	/// `region` must fit within `img`.
	pub fn build(img: &RgbImage, region: Region, params: &BuildParams) -> Option<QuadtreeNode> {
		if region.is_empty() {
			return None;
		}
		let color = region.average_color(img);
		let error = params.metric.compute_error(img, region, color);
		if error < params.threshold || region.area() < params.min_block_size || region.area() == 1 {
			return Some(QuadtreeNode { region, color, sections: None });
		}
		let [tl, tr, bl, br] = region.quadrants();
		Some(QuadtreeNode {
			region,
			color,
			sections: Some(Box::new([
				Self::build(img, tl, params),
				Self::build(img, tr, params),
				Self::build(img, bl, params),
				Self::build(img, br, params),
			])),
		})
	}

	pub fn is_leaf(&self) -> bool {
		self.sections.is_none()
	}

	/// The present subnodes, in top-left, top-right, bottom-left,
	/// bottom-right order. Empty for a leaf.
	pub fn children(&self) -> impl Iterator<Item = &QuadtreeNode> {
		self.sections.iter().flat_map(|s| s.iter().flatten())
	}
}

/// A compressed image: the quadtree plus the dimensions it was built from.
///
/// Immutable once built; picking another threshold means building another tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Quadtree {
	root: Option<QuadtreeNode>,
	width: u32,
	height: u32,
}

impl Quadtree {
	/// Partitions all of `img` according to `params`.
	pub fn from_image(img: &RgbImage, params: &BuildParams) -> Self {
		let root = QuadtreeNode::build(img, Region::whole(img), params);
		let tree = Quadtree { root, width: img.width(), height: img.height() };
		info!(
			"built quadtree for {}x{} image: metric={}, threshold={}, min_block_size={}, nodes={}",
			tree.width, tree.height, params.metric, params.threshold, params.min_block_size,
			tree.node_count()
		);
		tree
	}

	/// The root node; `None` only for an image with zero area.
	pub fn root(&self) -> Option<&QuadtreeNode> {
		self.root.as_ref()
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}
}

pub mod draw;
pub mod stats;

#[cfg(test)]
mod tests {
	use super::*;

	fn params(metric: ErrorMetric, threshold: f64, min_block_size: u64) -> BuildParams {
		BuildParams::new(metric, threshold, min_block_size).unwrap()
	}

	#[test]
	fn zero_area_builds_nothing() {
		let img = RgbImage::new(4, 4);
		let p = params(ErrorMetric::Variance, 0., 1);
		assert!(QuadtreeNode::build(&img, Region::new(1, 1, 0, 3), &p).is_none());
		assert!(QuadtreeNode::build(&img, Region::new(1, 1, 3, 0), &p).is_none());
		assert!(Quadtree::from_image(&RgbImage::new(0, 7), &p).root().is_none());
	}

	#[test]
	fn uniform_image_is_one_leaf() {
		let img = RgbImage::from_pixel(9, 5, image::Rgb([40, 50, 60]));
		for metric in ErrorMetric::ALL.iter() {
			let tree = Quadtree::from_image(&img, &params(*metric, 0.5, 1));
			let root = tree.root().unwrap();
			assert!(root.is_leaf());
			assert_eq!(root.color, image::Rgb([40, 50, 60]));
		}
	}

	#[test]
	fn min_block_size_compares_area() {
		// A 1x8 sliver with area 8 still splits when the minimum is 8.
		let img = RgbImage::from_fn(1, 8, |_, y| image::Rgb([y as u8 * 30; 3]));
		let tree = Quadtree::from_image(&img, &params(ErrorMetric::MaxPixelDifference, 0., 8));
		let root = tree.root().unwrap();
		let sections = root.sections.as_ref().unwrap();
		assert!(sections[0].is_none());
		assert!(sections[2].is_none());
		assert!(sections[1].as_ref().unwrap().is_leaf());
		assert!(sections[3].as_ref().unwrap().is_leaf());
		assert_eq!(root.children().count(), 2);
	}

	#[test]
	fn single_pixels_are_leaves() {
		let img = RgbImage::from_fn(3, 3, |x, y| image::Rgb([(x * 3 + y) as u8 * 20; 3]));
		let tree = Quadtree::from_image(&img, &params(ErrorMetric::Entropy, 0., 1));
		fn check(node: &QuadtreeNode) {
			if node.is_leaf() {
				assert_eq!(node.region.area(), 1);
			}
			node.children().for_each(check);
		}
		check(tree.root().unwrap());
	}

	#[test]
	fn rejects_bad_params() {
		assert!(BuildParams::new(ErrorMetric::Variance, 1., 0).is_err());
		assert!(BuildParams::new(ErrorMetric::MeanAbsoluteDeviation, 130., 1).is_err());
		assert!(BuildParams::new(ErrorMetric::Ssim, 2., 1).is_ok());
	}
}
