//! Reading and writing pixel data, and measuring the result on disk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, RgbImage};
use tracing::{info, warn};

use crate::node::error::CodecError;

/// JPEG output is written at full quality so that the only loss is the
/// quadtree's.
pub const JPEG_QUALITY: u8 = 100;

/// Output formats `save_image` and `encode_image` can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
	Png,
	Jpeg,
	Gif,
}

impl OutputFormat {
	/// Picks the format named by an extension, ignoring case.
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_ascii_lowercase().as_str() {
			"png" => Some(OutputFormat::Png),
			"jpg" | "jpeg" => Some(OutputFormat::Jpeg),
			"gif" => Some(OutputFormat::Gif),
			_ => None,
		}
	}

	/// Picks the format named by `path`'s extension.
	pub fn from_path(path: &Path) -> Result<Self, CodecError> {
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
		Self::from_extension(ext).ok_or_else(|| CodecError::UnsupportedFormat {
			path: path.to_owned(),
			extension: ext.to_string(),
		})
	}
}

/// Decodes any image the `image` crate understands into 8-bit RGB.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, CodecError> {
	let path = path.as_ref();
	let img = image::open(path)
		.map_err(|source| CodecError::Load { path: path.to_owned(), source })?
		.into_rgb8();
	info!("loaded {} ({}x{})", path.display(), img.width(), img.height());
	Ok(img)
}

/// Encodes `img` into `writer` as `format`.
pub fn encode_image<W: Write>(writer: W, img: &RgbImage, format: OutputFormat) -> Result<(), ImageError> {
	let (w, h) = img.dimensions();
	match format {
		OutputFormat::Png => PngEncoder::new(writer).write_image(img.as_raw(), w, h, ColorType::Rgb8),
		OutputFormat::Jpeg => JpegEncoder::new_with_quality(writer, JPEG_QUALITY)
			.write_image(img.as_raw(), w, h, ColorType::Rgb8),
		OutputFormat::Gif => {
			let frame = image::DynamicImage::ImageRgb8(img.clone()).into_rgba8();
			image::codecs::gif::GifEncoder::new(writer)
				.encode(frame.as_raw(), w, h, ColorType::Rgba8)
		},
	}
}

/// Writes `img` to `path`, choosing the format from the extension.
///
/// An unrecognized extension is reported as `UnsupportedFormat` before
/// anything is created on disk.
pub fn save_image<P: AsRef<Path>>(path: P, img: &RgbImage) -> Result<(), CodecError> {
	let path = path.as_ref();
	let format = OutputFormat::from_path(path).map_err(|e| {
		warn!("{}", e);
		e
	})?;
	let encode_err = |source: ImageError| CodecError::Encode { path: path.to_owned(), source };
	let file = File::create(path).map_err(|e| encode_err(ImageError::IoError(e)))?;
	let mut writer = BufWriter::new(file);
	encode_image(&mut writer, img, format).map_err(encode_err)?;
	writer.flush().map_err(|e| encode_err(ImageError::IoError(e)))?;
	info!("saved image to {}", path.display());
	Ok(())
}

/// Size of the file at `path`, in bytes.
pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64, CodecError> {
	let path = path.as_ref();
	std::fs::metadata(path)
		.map(|m| m.len())
		.map_err(|source| CodecError::SizeQuery { path: path.to_owned(), source })
}

/// Percentage by which `compressed` is smaller than `original`:
/// `(1 - compressed / original) * 100`.
///
/// Negative when the output grew.
pub fn compression_ratio<P: AsRef<Path>, Q: AsRef<Path>>(original: P, compressed: Q) -> Result<f64, CodecError> {
	let original = file_size(original)?;
	let compressed = file_size(compressed)?;
	Ok(ratio_of_sizes(original, compressed))
}

/// The ratio `compression_ratio` reports, from byte counts.
pub fn ratio_of_sizes(original: u64, compressed: u64) -> f64 {
	(1. - compressed as f64 / original as f64) * 100.
}
