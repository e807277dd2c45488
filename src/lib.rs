//! Lossy image compression by quadtree partitioning.
//!
//! An image is split recursively into quadrants until each block is
//! uniform enough under an [`ErrorMetric`], then every block is replaced
//! by its average color.

pub mod calibrate;
pub mod codec;
pub mod node;
pub mod visualize;

pub use node::*;
pub use node::metric::ErrorMetric;
pub use node::region::{Color, Region};
pub use node::stats::TreeStats;
