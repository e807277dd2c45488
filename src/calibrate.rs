//! Searching for the threshold that gives a requested compression ratio.

use std::path::PathBuf;

use image::RgbImage;
use tracing::{debug, info};

use crate::codec::{self, OutputFormat};
use crate::node::error::{CodecError, ParamError};
use crate::node::metric::ErrorMetric;
use crate::node::{BuildParams, Quadtree};

/// Bisection steps; 20 halvings resolve the threshold to about a
/// millionth of the metric's range.
pub const CALIBRATION_ITERATIONS: usize = 20;

/// Measures how well a reconstructed image compresses.
pub trait RatioProbe {
	/// Encodes `img` and returns its compression ratio as a percentage,
	/// `(1 - compressed / original) * 100`.
	fn ratio(&mut self, img: &RgbImage) -> Result<f64, CodecError>;
}

/// Probes by writing each candidate to a scratch file and comparing file
/// sizes with the original on disk.
#[derive(Clone, Debug)]
pub struct FileProbe {
	pub original: PathBuf,
	/// Output path; its extension picks the format.
	pub scratch: PathBuf,
}

impl RatioProbe for FileProbe {
	fn ratio(&mut self, img: &RgbImage) -> Result<f64, CodecError> {
		codec::save_image(&self.scratch, img)?;
		codec::compression_ratio(&self.original, &self.scratch)
	}
}

/// Probes by encoding in memory and comparing against a known byte count.
#[derive(Clone, Copy, Debug)]
pub struct MemoryProbe {
	pub original_bytes: u64,
	pub format: OutputFormat,
}

impl RatioProbe for MemoryProbe {
	fn ratio(&mut self, img: &RgbImage) -> Result<f64, CodecError> {
		let mut buf = Vec::new();
		codec::encode_image(&mut buf, img, self.format).map_err(|source| CodecError::Encode {
			path: PathBuf::from("<memory>"),
			source,
		})?;
		Ok(codec::ratio_of_sizes(self.original_bytes, buf.len() as u64))
	}
}

/// Outcome of a calibration run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
	/// Threshold to commit to.
	pub threshold: f64,
	/// Ratio measured at `threshold`; `None` when the target was never
	/// reached and the threshold is the top of the metric's range, which
	/// bisection never evaluates.
	pub ratio: Option<f64>,
	pub iterations: usize,
}

impl Calibration {
	/// Parameters for the final build: the calibrated threshold with a
	/// minimum block size of 1.
	pub fn params(&self, metric: ErrorMetric) -> BuildParams {
		BuildParams { metric, threshold: self.threshold, min_block_size: 1 }
	}
}

/// Checks that `target` is a fraction in (0, 1].
pub fn validate_target(target: f64) -> Result<f64, ParamError> {
	if target > 0. && target <= 1. {
		Ok(target)
	} else {
		Err(ParamError::InvalidTargetRatio(target))
	}
}

/// Bisects the metric's threshold range for a tree whose reconstruction
/// compresses by at least `target` (a fraction, e.g. 0.6 for 60%).
///
/// Each step builds a fresh tree with a minimum block size of 1,
/// reconstructs it and hands it to `probe`. A ratio below the target
/// raises the lower bound, anything else lowers the upper bound; this
/// relies on a larger threshold never producing more leaves.
///
/// An unreachable target isn't an error: the search just ends at the
/// nearest end of the range after `iterations` steps. Probe errors abort
/// the search.
pub fn calibrate_threshold<R: RatioProbe>(
	img: &RgbImage,
	metric: ErrorMetric,
	target: f64,
	iterations: usize,
	probe: &mut R
) -> Result<Calibration, CalibrateError> {
	let target = validate_target(target)?;
	let (mut low, mut high) = metric.threshold_range();
	let mut high_ratio = None;
	for step in 0..iterations {
		let mid = (low + high) / 2.;
		let params = BuildParams { metric, threshold: mid, min_block_size: 1 };
		let tree = Quadtree::from_image(img, &params);
		let ratio = probe.ratio(&tree.reconstruct())?;
		debug!(
			"calibration step {}: threshold={:.6} ratio={:.3}% nodes={}",
			step, mid, ratio, tree.node_count()
		);
		if ratio < target * 100. {
			low = mid;
		} else {
			high = mid;
			high_ratio = Some(ratio);
		}
	}
	info!(
		"calibrated {} threshold to {} for target {}% ({:?}% measured)",
		metric, high, target * 100., high_ratio
	);
	Ok(Calibration { threshold: high, ratio: high_ratio, iterations })
}

/// Reason why calibration stopped.
#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
	#[error(transparent)]
	Param(#[from] ParamError),
	#[error(transparent)]
	Codec(#[from] CodecError),
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Ratio grows with how few distinct colors the image has.
	struct PaletteProbe;

	impl RatioProbe for PaletteProbe {
		fn ratio(&mut self, img: &RgbImage) -> Result<f64, CodecError> {
			let distinct = img.pixels().collect::<std::collections::HashSet<_>>().len();
			Ok((1. - distinct as f64 / (img.width() * img.height()) as f64) * 100.)
		}
	}

	struct FailingProbe;

	impl RatioProbe for FailingProbe {
		fn ratio(&mut self, _: &RgbImage) -> Result<f64, CodecError> {
			Err(CodecError::SizeQuery {
				path: PathBuf::from("missing"),
				source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
			})
		}
	}

	fn gradient() -> RgbImage {
		RgbImage::from_fn(16, 16, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 100]))
	}

	#[test]
	fn target_bounds() {
		assert!(validate_target(0.).is_err());
		assert!(validate_target(1.).is_ok());
		assert!(validate_target(1.5).is_err());
		let r = calibrate_threshold(&gradient(), ErrorMetric::Variance, -0.2, 20, &mut PaletteProbe);
		assert!(matches!(r, Err(CalibrateError::Param(_))));
	}

	#[test]
	fn reaches_reachable_target() {
		let cal = calibrate_threshold(&gradient(), ErrorMetric::MaxPixelDifference, 0.9, 20, &mut PaletteProbe)
			.unwrap();
		assert!(cal.ratio.unwrap() >= 90.);
		let (low, high) = ErrorMetric::MaxPixelDifference.threshold_range();
		assert!(cal.threshold > low && cal.threshold < high);
	}

	#[test]
	fn probe_failure_aborts() {
		let r = calibrate_threshold(&gradient(), ErrorMetric::Entropy, 0.5, 20, &mut FailingProbe);
		assert!(matches!(r, Err(CalibrateError::Codec(CodecError::SizeQuery { .. }))));
	}
}
