use image::error::ImageError;
use image::RgbImage;

use quadtree_compress::calibrate::{self, FileProbe, CALIBRATION_ITERATIONS};
use quadtree_compress::codec::{self, OutputFormat};
use quadtree_compress::error::CodecError;
use quadtree_compress::{visualize, BuildParams, ErrorMetric, Quadtree};

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

fn codec_exit(e: &CodecError) -> ! {
	let code = match e {
		CodecError::Load { source: ImageError::Decoding(_), .. } |
		CodecError::Load { source: ImageError::Unsupported(_), .. } => 4,
		_ => 3,
	};
	error_exit(&e.to_string(), code)
}

/// Asks on stdin until `parse` accepts the answer.
///
/// Exits with status 2 if stdin runs out first.
fn prompt<T, F: FnMut(&str) -> Result<T, String>>(question: &str, mut parse: F) -> T {
	let stdin = std::io::stdin();
	let mut lines = stdin.lock().lines();
	loop {
		print!("{}: ", question);
		// A failed flush only loses the prompt text.
		let _ = std::io::stdout().flush();
		let line = match lines.next() {
			Some(Ok(l)) => l,
			_ => error_exit("No more input", 2),
		};
		match parse(line.trim()) {
			Ok(v) => return v,
			Err(msg) => eprintln!("{}", msg),
		}
	}
}

/// Takes a command-line value if there is one, or prompts for it.
///
/// A bad command-line value is fatal; a bad answer is asked again.
fn arg_or_prompt<T, F: FnMut(&str) -> Result<T, String>>(
	value: Option<&str>,
	question: &str,
	mut parse: F
) -> T {
	match value {
		Some(v) => match parse(v) {
			Ok(t) => t,
			Err(msg) => error_exit(&msg, 2),
		},
		None => prompt(question, parse),
	}
}

fn parse_output_path(s: &str) -> Result<PathBuf, String> {
	let path = PathBuf::from(s);
	OutputFormat::from_path(&path).map_err(|e| e.to_string())?;
	Ok(path)
}

/// `clap`-based CLI for compressing images with a quadtree.
///
/// Any parameter missing from the command line is asked for on stdin.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
fn main() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();

	let clap_matches = clap::App::new("quadtree_compress")
		.version("0.1.0")
		.author("vkcz")
		.about("Compresses an image by replacing uniform quadtree blocks with their average color.")
		.arg_from_usage("-m, --metric=[METRIC] 'Error metric: 1-5 or variance, mad, max-diff, entropy, ssim'")
		.arg_from_usage("-t, --threshold=[N] 'Error below which a block is not split; must lie in the metric range'")
		.arg_from_usage("-b, --min-block=[N] 'Blocks with fewer pixels than this are not split'")
		.arg_from_usage("-r, --target-ratio=[N] 'Target compression ratio in (0, 1]; 0 disables calibration'")
		.arg_from_usage("-o, --output=[OUTPUT] 'Path for the compressed image (.png, .jpg, .jpeg or .gif)'")
		.arg_from_usage("-g, --gif=[GIF] 'Path for an animation of the tree being built'")
		.arg_from_usage("--gif-delay=[MS] 'Milliseconds per animation frame; defaults to 500'")
		.arg_from_usage("[INPUT] 'Path to input image'")
		.get_matches();

	let (input_path, source): (PathBuf, RgbImage) = match clap_matches.value_of("INPUT") {
		Some(p) => match codec::load_image(p) {
			Ok(img) => (PathBuf::from(p), img),
			Err(e) => codec_exit(&e),
		},
		None => prompt("Input image path", |s| {
			codec::load_image(s).map(|img| (PathBuf::from(s), img)).map_err(|e| e.to_string())
		}),
	};

	let menu = ErrorMetric::ALL.iter()
		.map(|m| format!("{}. {}", m.choice(), m))
		.collect::<Vec<_>>()
		.join(", ");
	let metric = arg_or_prompt(
		clap_matches.value_of("metric"),
		&format!("Error metric ({})", menu),
		|s| s.parse::<ErrorMetric>().map_err(|e| e.to_string())
	);
	let (low, high) = metric.threshold_range();
	let threshold = arg_or_prompt(
		clap_matches.value_of("threshold"),
		&format!("Threshold [{}, {}]", low, high),
		|s| {
			let t = s.parse::<f64>().map_err(|_| "Non-numeric value for threshold".to_string())?;
			metric.validate_threshold(t).map_err(|e| e.to_string())
		}
	);
	let min_block_size = arg_or_prompt(
		clap_matches.value_of("min-block"),
		"Minimum block size (pixels)",
		|s| match s.parse::<u64>() {
			Ok(n) if n > 0 => Ok(n),
			_ => Err("Minimum block size must be a positive integer".to_string()),
		}
	);
	let target = arg_or_prompt(
		clap_matches.value_of("target-ratio"),
		"Target compression ratio (0 to disable, otherwise up to 1)",
		|s| {
			let t = s.parse::<f64>().map_err(|_| "Non-numeric value for target ratio".to_string())?;
			if t == 0. {
				Ok(None)
			} else {
				calibrate::validate_target(t).map(Some).map_err(|e| e.to_string())
			}
		}
	);
	let output_path = arg_or_prompt(
		clap_matches.value_of("output"),
		"Output image path",
		parse_output_path
	);
	let gif_path = match clap_matches.value_of("gif") {
		Some(p) => Some(PathBuf::from(p)),
		None if clap_matches.value_of("INPUT").is_some() => None,
		None => prompt("Animation GIF path (empty to skip)", |s| Ok(
			if s.is_empty() { None } else { Some(PathBuf::from(s)) }
		)),
	};
	let gif_delay = match clap_matches.value_of("gif-delay").unwrap_or("500").parse::<u32>() {
		Ok(n) => n,
		Err(_) => error_exit("Non-numeric value for gif-delay", 2),
	};

	let started = Instant::now();
	let params = match target {
		None => match BuildParams::new(metric, threshold, min_block_size) {
			Ok(p) => p,
			Err(e) => error_exit(&e.to_string(), 2),
		},
		Some(target) => {
			let mut probe = FileProbe { original: input_path.clone(), scratch: output_path.clone() };
			match calibrate::calibrate_threshold(&source, metric, target, CALIBRATION_ITERATIONS, &mut probe) {
				Ok(cal) => {
					println!("Calibrated threshold: {}", cal.threshold);
					cal.params(metric)
				},
				Err(calibrate::CalibrateError::Codec(e)) => codec_exit(&e),
				Err(e) => error_exit(&e.to_string(), 2),
			}
		},
	};
	let tree = Quadtree::from_image(&source, &params);
	let output = tree.reconstruct();
	if let Err(e) = codec::save_image(&output_path, &output) {
		codec_exit(&e);
	}
	let elapsed = started.elapsed();

	let original_size = codec::file_size(&input_path).unwrap_or_else(|e| codec_exit(&e));
	let compressed_size = codec::file_size(&output_path).unwrap_or_else(|e| codec_exit(&e));
	let ratio = codec::ratio_of_sizes(original_size, compressed_size);
	let stats = tree.stats();
	println!("Execution time: {} ms", elapsed.as_millis());
	println!("Original size: {} bytes", original_size);
	println!("Compressed size: {} bytes", compressed_size);
	println!("Compression ratio: {:.2}%", ratio);
	if let Some(target) = target {
		println!("Target ratio: {:.2}%", target * 100.);
	}
	println!("Tree depth: {}", stats.max_depth);
	println!("Node count: {}", stats.node_count);
	println!("Leaf count: {}", stats.leaf_count);
	println!("Compressed image saved to {}", output_path.display());

	if let Some(gif_path) = gif_path {
		match visualize::export_gif(&gif_path, &tree, gif_delay) {
			Ok(()) => println!("Animation saved to {}", gif_path.display()),
			Err(e) => codec_exit(&e),
		}
	}
}
