//! Statistics measuring how far a region is from being one flat color.
//!
//! Every metric is a pure function of the pixel data in a region. The
//! region must have positive area; the builder never asks about an empty one.

use image::RgbImage;

use super::error::ParamError;
use super::region::{Color, Region};

/// Stabilizing constant for the luminance term, `(0.01 * 255)^2`.
pub const SSIM_C1: f64 = (0.01 * 255.) * (0.01 * 255.);
/// Stabilizing constant for the contrast term, `(0.03 * 255)^2`.
pub const SSIM_C2: f64 = (0.03 * 255.) * (0.03 * 255.);

/// Selects the statistic used to decide whether a region gets split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorMetric {
	Variance,
	MeanAbsoluteDeviation,
	MaxPixelDifference,
	Entropy,
	Ssim,
}

impl ErrorMetric {
	/// All metrics, in menu order.
	pub const ALL: [ErrorMetric; 5] = [
		ErrorMetric::Variance,
		ErrorMetric::MeanAbsoluteDeviation,
		ErrorMetric::MaxPixelDifference,
		ErrorMetric::Entropy,
		ErrorMetric::Ssim,
	];

	/// Looks up a metric by its 1-based menu number.
	pub fn from_choice(n: u8) -> Option<Self> {
		Self::ALL.get((n as usize).checked_sub(1)?).copied()
	}

	/// 1-based menu number.
	pub fn choice(self) -> u8 {
		match self {
			ErrorMetric::Variance => 1,
			ErrorMetric::MeanAbsoluteDeviation => 2,
			ErrorMetric::MaxPixelDifference => 3,
			ErrorMetric::Entropy => 4,
			ErrorMetric::Ssim => 5,
		}
	}

	/// Inclusive range of values `compute_error` can return, which is also
	/// the range of meaningful thresholds.
	///
	/// For SSIM this is the range of `1 - SSIM`.
	pub fn threshold_range(self) -> (f64, f64) {
		match self {
			ErrorMetric::Variance => (0., 16256.25),
			ErrorMetric::MeanAbsoluteDeviation => (0., 127.5),
			ErrorMetric::MaxPixelDifference => (0., 255.),
			ErrorMetric::Entropy => (0., 8.),
			ErrorMetric::Ssim => (0., 2.),
		}
	}

	/// Checks that `threshold` lies in this metric's range.
	pub fn validate_threshold(self, threshold: f64) -> Result<f64, ParamError> {
		let (low, high) = self.threshold_range();
		if threshold >= low && threshold <= high {
			Ok(threshold)
		} else {
			Err(ParamError::ThresholdOutOfRange { metric: self, threshold, low, high })
		}
	}

	/// Split error of `region` against its average color `avg`.
	///
	/// Larger means less uniform. SSIM is turned into an error as `1 - SSIM`.
	pub fn compute_error(self, img: &RgbImage, region: Region, avg: Color) -> f64 {
		match self {
			ErrorMetric::Variance => variance(img, region, avg),
			ErrorMetric::MeanAbsoluteDeviation => mean_absolute_deviation(img, region, avg),
			ErrorMetric::MaxPixelDifference => max_pixel_difference(img, region),
			ErrorMetric::Entropy => entropy(img, region),
			ErrorMetric::Ssim => 1. - ssim(img, region, avg),
		}
	}
}

impl std::fmt::Display for ErrorMetric {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			ErrorMetric::Variance => "Variance",
			ErrorMetric::MeanAbsoluteDeviation => "Mean Absolute Deviation",
			ErrorMetric::MaxPixelDifference => "Max Pixel Difference",
			ErrorMetric::Entropy => "Entropy",
			ErrorMetric::Ssim => "SSIM",
		})
	}
}

impl std::str::FromStr for ErrorMetric {
	type Err = ParamError;

	/// Accepts a menu number or a short name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if let Ok(n) = s.parse::<u8>() {
			return Self::from_choice(n).ok_or_else(|| ParamError::UnknownMetric(s.to_string()));
		}
		match s.to_ascii_lowercase().as_str() {
			"variance" | "var" => Ok(ErrorMetric::Variance),
			"mad" | "mean-absolute-deviation" => Ok(ErrorMetric::MeanAbsoluteDeviation),
			"max-diff" | "max-pixel-difference" | "mpd" => Ok(ErrorMetric::MaxPixelDifference),
			"entropy" => Ok(ErrorMetric::Entropy),
			"ssim" => Ok(ErrorMetric::Ssim),
			_ => Err(ParamError::UnknownMetric(s.to_string())),
		}
	}
}

fn channel_diffs(p: &Color, avg: Color) -> [f64; 3] {
	[
		p.0[0] as f64 - avg.0[0] as f64,
		p.0[1] as f64 - avg.0[1] as f64,
		p.0[2] as f64 - avg.0[2] as f64,
	]
}

/// Mean squared channel deviation from `avg`, over all three channels.
pub fn variance(img: &RgbImage, region: Region, avg: Color) -> f64 {
	let sum: f64 = region.pixels(img)
		.map(|p| channel_diffs(p, avg).iter().map(|d| d * d).sum::<f64>())
		.sum();
	sum / (3 * region.area()) as f64
}

/// Mean absolute channel deviation from `avg`, over all three channels.
pub fn mean_absolute_deviation(img: &RgbImage, region: Region, avg: Color) -> f64 {
	let sum: f64 = region.pixels(img)
		.map(|p| channel_diffs(p, avg).iter().map(|d| d.abs()).sum::<f64>())
		.sum();
	sum / (3 * region.area()) as f64
}

/// Mean over channels of the spread between the largest and smallest value.
pub fn max_pixel_difference(img: &RgbImage, region: Region) -> f64 {
	let (min, max) = region.pixels(img).fold(([255u8; 3], [0u8; 3]), |(mut min, mut max), p| {
		for c in 0..3 {
			min[c] = min[c].min(p.0[c]);
			max[c] = max[c].max(p.0[c]);
		}
		(min, max)
	});
	(0..3).map(|c| (max[c] - min[c]) as f64).sum::<f64>() / 3.
}

/// Mean over channels of the Shannon entropy (bits) of each channel's
/// value histogram.
pub fn entropy(img: &RgbImage, region: Region) -> f64 {
	let mut freq = [[0u64; 256]; 3];
	for p in region.pixels(img) {
		for c in 0..3 {
			freq[c][p.0[c] as usize] += 1;
		}
	}
	let total = region.area() as f64;
	let h: f64 = freq.iter()
		.flat_map(|channel| channel.iter())
		.filter(|&&n| n > 0)
		.map(|&n| {
			let p = n as f64 / total;
			-p * p.log2()
		})
		.sum();
	h / 3.
}

/// Mean over channels of the structural similarity between the region and
/// a flat block of `avg`.
pub fn ssim(img: &RgbImage, region: Region, avg: Color) -> f64 {
	let mut sum = [0f64; 3];
	let mut sum_sq = [0f64; 3];
	let mut sum_cross = [0f64; 3];
	for p in region.pixels(img) {
		for c in 0..3 {
			let v = p.0[c] as f64;
			sum[c] += v;
			sum_sq[c] += v * v;
			sum_cross[c] += v * avg.0[c] as f64;
		}
	}
	let n = region.area() as f64;
	(0..3).map(|c| {
		let mean_x = sum[c] / n;
		let mean_y = avg.0[c] as f64;
		// Cancellation can push a zero variance slightly negative.
		let var_x = (sum_sq[c] / n - mean_x * mean_x).max(0.);
		let cov = sum_cross[c] / n - mean_x * mean_y;
		((2. * mean_x * mean_y + SSIM_C1) * (2. * cov + SSIM_C2)) /
			((mean_x * mean_x + mean_y * mean_y + SSIM_C1) * (var_x + SSIM_C2))
	}).sum::<f64>() / 3.
}

#[cfg(test)]
mod tests {
	use super::*;

	fn checker(w: u32, h: u32, a: [u8; 3], b: [u8; 3]) -> RgbImage {
		RgbImage::from_fn(w, h, |x, y| image::Rgb(if (x + y) % 2 == 0 { a } else { b }))
	}

	#[test]
	fn flat_region_scores_zero() {
		let img = RgbImage::from_pixel(5, 3, image::Rgb([12, 200, 77]));
		let region = Region::whole(&img);
		let avg = region.average_color(&img);
		for metric in ErrorMetric::ALL.iter() {
			assert_eq!(metric.compute_error(&img, region, avg), 0., "{}", metric);
		}
		assert_eq!(ssim(&img, region, avg), 1.);
	}

	#[test]
	fn black_white_checkerboard() {
		let img = checker(4, 4, [0; 3], [255; 3]);
		let region = Region::whole(&img);
		let avg = region.average_color(&img);
		assert_eq!(avg, image::Rgb([127; 3]));
		assert_eq!(max_pixel_difference(&img, region), 255.);
		assert!((entropy(&img, region) - 1.).abs() < 1e-12);
		// Half the samples are 127 away and half 128 away.
		assert!((mean_absolute_deviation(&img, region, avg) - 127.5).abs() < 1e-12);
		assert!((variance(&img, region, avg) - (127. * 127. + 128. * 128.) / 2.).abs() < 1e-9);
		let err = ErrorMetric::Ssim.compute_error(&img, region, avg);
		assert!(err > 0.99 && err <= 2.);
	}

	#[test]
	fn entropy_of_four_values_is_two_bits() {
		let img = RgbImage::from_fn(4, 1, |x, _| image::Rgb([x as u8; 3]));
		let region = Region::whole(&img);
		assert!((entropy(&img, region) - 2.).abs() < 1e-12);
	}

	#[test]
	fn metrics_only_read_the_region() {
		let mut img = RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]));
		img.put_pixel(3, 3, image::Rgb([250, 0, 90]));
		let region = Region::new(0, 0, 2, 2);
		let avg = region.average_color(&img);
		for metric in ErrorMetric::ALL.iter() {
			assert_eq!(metric.compute_error(&img, region, avg), 0.);
		}
	}

	#[test]
	fn choices_and_names() {
		for metric in ErrorMetric::ALL.iter() {
			assert_eq!(ErrorMetric::from_choice(metric.choice()), Some(*metric));
		}
		assert_eq!(ErrorMetric::from_choice(0), None);
		assert_eq!(ErrorMetric::from_choice(6), None);
		assert_eq!("3".parse::<ErrorMetric>().unwrap(), ErrorMetric::MaxPixelDifference);
		assert_eq!("SSIM".parse::<ErrorMetric>().unwrap(), ErrorMetric::Ssim);
		assert!("median".parse::<ErrorMetric>().is_err());
		assert!("9".parse::<ErrorMetric>().is_err());
	}

	#[test]
	fn threshold_validation() {
		assert!(ErrorMetric::Entropy.validate_threshold(8.).is_ok());
		assert!(ErrorMetric::Entropy.validate_threshold(8.5).is_err());
		assert!(ErrorMetric::Variance.validate_threshold(-1.).is_err());
		assert!(ErrorMetric::Ssim.validate_threshold(f64::NAN).is_err());
	}
}
