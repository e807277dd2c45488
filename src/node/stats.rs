use bitvec::vec::BitVec;

use super::error::DrawError;
use super::{Quadtree, QuadtreeNode};

/// Summary of a tree's shape, for reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
	pub max_depth: usize,
	pub node_count: usize,
	pub leaf_count: usize,
}

/// Number of levels: 0 for no tree, 1 for a lone leaf.
pub fn max_depth(node: Option<&QuadtreeNode>) -> usize {
	node.map_or(0, |n| 1 + n.children().map(|c| max_depth(Some(c))).max().unwrap_or(0))
}

/// Number of nodes, branches included.
pub fn node_count(node: Option<&QuadtreeNode>) -> usize {
	node.map_or(0, |n| 1 + n.children().map(|c| node_count(Some(c))).sum::<usize>())
}

pub fn leaf_count(node: Option<&QuadtreeNode>) -> usize {
	match node {
		None => 0,
		Some(n) if n.is_leaf() => 1,
		Some(n) => n.children().map(|c| leaf_count(Some(c))).sum(),
	}
}

impl Quadtree {
	pub fn max_depth(&self) -> usize {
		max_depth(self.root())
	}

	pub fn node_count(&self) -> usize {
		node_count(self.root())
	}

	pub fn leaf_count(&self) -> usize {
		leaf_count(self.root())
	}

	pub fn stats(&self) -> TreeStats {
		TreeStats {
			max_depth: self.max_depth(),
			node_count: self.node_count(),
			leaf_count: self.leaf_count(),
		}
	}

	/// Checks that the leaves cover every pixel of the image exactly once.
	pub fn verify_tiling(&self) -> Result<(), DrawError> {
		let (width, height) = (self.width(), self.height());
		let mut covered: BitVec = BitVec::repeat(false, width as usize * height as usize);
		if let Some(root) = self.root() {
			mark_leaves(root, &mut covered, width, height)?;
		}
		match covered.first_zero() {
			Some(i) => Err(DrawError::Gap { x: (i % width as usize) as u32, y: (i / width as usize) as u32 }),
			None => Ok(()),
		}
	}
}

fn mark_leaves(node: &QuadtreeNode, covered: &mut BitVec, width: u32, height: u32) -> Result<(), DrawError> {
	if !node.is_leaf() {
		return node.children().try_for_each(|c| mark_leaves(c, covered, width, height));
	}
	let r = node.region;
	if !r.fits_within(width, height) {
		return Err(DrawError::InvalidRegion { region: r, width, height });
	}
	for y in r.y..r.y + r.height {
		for x in r.x..r.x + r.width {
			if covered.replace(y as usize * width as usize + x as usize, true) {
				return Err(DrawError::Overlap { x, y });
			}
		}
	}
	Ok(())
}
