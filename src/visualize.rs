//! Animated view of how the quadtree refines the image, one level per frame.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, ImageError, RgbImage};
use tracing::info;

use crate::node::error::CodecError;
use crate::node::{Quadtree, QuadtreeNode};

/// Renders the tree level by level.
///
/// Frame `n` shows every node of depth `n` painted with its average color
/// on top of frame `n - 1`, so subtrees that aren't resolved yet show
/// their ancestor's color. Rendering stops after the first level made
/// entirely of leaves. An empty tree yields no frames.
pub fn frames(tree: &Quadtree) -> Vec<RgbImage> {
	let mut canvas = RgbImage::new(tree.width(), tree.height());
	let mut frontier: Vec<&QuadtreeNode> = tree.root().into_iter().collect();
	let mut out = Vec::new();
	while !frontier.is_empty() {
		for node in frontier.iter() {
			node.fill(&mut canvas, node.region);
		}
		out.push(canvas.clone());
		frontier = frontier.into_iter().flat_map(|n| n.children()).collect();
	}
	out
}

/// Writes `frames(tree)` to `path` as a looping GIF, `delay_ms` per frame.
pub fn export_gif<P: AsRef<Path>>(path: P, tree: &Quadtree, delay_ms: u32) -> Result<(), CodecError> {
	let path = path.as_ref();
	let encode_err = |source: ImageError| CodecError::Encode { path: path.to_owned(), source };
	let file = File::create(path).map_err(|e| encode_err(ImageError::IoError(e)))?;
	let mut encoder = GifEncoder::new(BufWriter::new(file));
	encoder.set_repeat(Repeat::Infinite).map_err(encode_err)?;
	let rendered = frames(tree);
	let count = rendered.len();
	encoder
		.encode_frames(rendered.into_iter().map(|f| Frame::from_parts(
			DynamicImage::ImageRgb8(f).into_rgba8(),
			0,
			0,
			Delay::from_numer_denom_ms(delay_ms, 1),
		)))
		.map_err(encode_err)?;
	info!("saved {} frame animation to {}", count, path.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::metric::ErrorMetric;
	use crate::node::BuildParams;

	#[test]
	fn one_frame_per_level() {
		let img = RgbImage::from_fn(8, 8, |x, y| image::Rgb([(x * 30) as u8, (y * 30) as u8, 0]));
		let params = BuildParams::new(ErrorMetric::MeanAbsoluteDeviation, 0., 1).unwrap();
		let tree = Quadtree::from_image(&img, &params);
		let frames = frames(&tree);
		assert_eq!(frames.len(), tree.max_depth());
		assert!(frames[0].pixels().all(|p| *p == tree.root().unwrap().color));
		assert_eq!(frames.last().unwrap(), &tree.reconstruct());
	}

	#[test]
	fn empty_tree_has_no_frames() {
		let params = BuildParams::new(ErrorMetric::Entropy, 1., 1).unwrap();
		assert!(frames(&Quadtree::from_image(&RgbImage::new(0, 0), &params)).is_empty());
	}
}
