use std::path::PathBuf;

use thiserror::Error;

use super::metric::ErrorMetric;
use super::region::Region;

/// Reason why a compression parameter was rejected.
#[derive(Error, Debug)]
pub enum ParamError {
	/// The threshold lies outside the range the metric can produce.
	#[error("threshold {threshold} is outside the {metric} range [{low}, {high}]")]
	ThresholdOutOfRange { metric: ErrorMetric, threshold: f64, low: f64, high: f64 },
	/// The minimum block size must be a positive pixel count.
	#[error("minimum block size must be positive")]
	InvalidMinBlockSize,
	/// A target ratio must be a fraction in (0, 1].
	#[error("target compression ratio {0} is not in (0, 1]")]
	InvalidTargetRatio(f64),
	/// No metric goes by that number or name.
	#[error("unknown error metric `{0}`")]
	UnknownMetric(String),
}

/// Reason why a quadtree couldn't be drawn or doesn't tile its image.
///
/// A tree produced by the builder never triggers these; they come from
/// drawing a node into a buffer it wasn't built for.
#[derive(Error, Debug)]
pub enum DrawError {
	/// A leaf lies (partly) outside the target buffer.
	#[error("region {region} lies outside a {width}x{height} image")]
	InvalidRegion { region: Region, width: u32, height: u32 },
	/// A pixel is covered by more than one leaf.
	#[error("pixel ({x}, {y}) is covered by more than one leaf")]
	Overlap { x: u32, y: u32 },
	/// A pixel is covered by no leaf.
	#[error("pixel ({x}, {y}) is not covered by any leaf")]
	Gap { x: u32, y: u32 },
}

/// Reason why an image couldn't be read, written or measured.
#[derive(Error, Debug)]
pub enum CodecError {
	/// The source doesn't exist, can't be read, or isn't a decodable image.
	#[error("can't open image {}: {source}", .path.display())]
	Load { path: PathBuf, source: image::ImageError },
	/// The output extension doesn't name a supported format.
	#[error("unsupported output extension `.{extension}` for {}", .path.display())]
	UnsupportedFormat { path: PathBuf, extension: String },
	/// The encoder or the file system refused the output.
	#[error("failed to save image {}: {source}", .path.display())]
	Encode { path: PathBuf, source: image::ImageError },
	/// A file's size couldn't be queried.
	#[error("can't get file size of {}: {source}", .path.display())]
	SizeQuery { path: PathBuf, source: std::io::Error },
}
