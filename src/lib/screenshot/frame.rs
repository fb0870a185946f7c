use std::path::Path;

use anyhow::Context;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};

/// Frames with either dimension below this are capture glitches, not content.
pub const MIN_DIMENSION: u32 = 64;
/// Pixel prefix inspected by the degenerate-frame check.
const SAMPLE_PIXELS: usize = 100;
const JPEG_QUALITY: u8 = 85;

pub const LANDSCAPE_ENVELOPE: (u32, u32) = (1920, 1080);
pub const PORTRAIT_ENVELOPE: (u32, u32) = (1080, 1920);

/// Why a decoded frame was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameDefect {
    #[error("frame is implausibly small")]
    TooSmall,
    #[error("frame is uniformly black")]
    AllBlack,
    #[error("frame is uniformly white")]
    AllWhite,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Defect(#[from] FrameDefect),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reject degenerate frames: implausibly small dimensions, or a sampled
/// prefix that is uniformly pure black or pure white — the signature of a
/// capture taken before the compositor painted anything.
pub fn validate(image: &DynamicImage) -> Result<(), FrameDefect> {
    let (width, height) = image.dimensions();
    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(FrameDefect::TooSmall);
    }

    let rgb = image.to_rgb8();
    let sample: Vec<_> = rgb.pixels().take(SAMPLE_PIXELS).collect();
    if sample.iter().all(|pixel| pixel.0 == [0, 0, 0]) {
        return Err(FrameDefect::AllBlack);
    }
    if sample.iter().all(|pixel| pixel.0 == [255, 255, 255]) {
        return Err(FrameDefect::AllWhite);
    }

    Ok(())
}

/// Dimensions after scaling into the envelope matching the frame's
/// orientation, preserving aspect ratio.
pub fn fit_envelope(width: u32, height: u32) -> (u32, u32) {
    let (target_width, target_height) = if height > width {
        PORTRAIT_ENVELOPE
    } else {
        LANDSCAPE_ENVELOPE
    };

    let scale = f64::min(
        target_width as f64 / width as f64,
        target_height as f64 / height as f64,
    );

    (
        (width as f64 * scale) as u32,
        (height as f64 * scale) as u32,
    )
}

pub fn normalize(image: DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_envelope(width, height);
    if (new_width, new_height) == (width, height) {
        return image;
    }
    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Decode, validate, normalize and re-encode a captured frame in place.
/// Returns the final dimensions. Blocking — run on a blocking thread.
pub fn process(path: &Path) -> Result<(u32, u32), ProcessError> {
    // Sniff the real format: capture tools do not always honor the
    // extension they were asked for
    let image = image::io::Reader::open(path)
        .context("Failed to open captured frame")?
        .with_guessed_format()
        .context("Failed to read captured frame")?
        .decode()
        .context("Failed to decode captured frame")?;

    validate(&image)?;

    let normalized = normalize(image);
    let dimensions = normalized.dimensions();

    let file = std::fs::File::create(path).context("Failed to rewrite captured frame")?;
    let mut encoder = JpegEncoder::new_with_quality(std::io::BufWriter::new(file), JPEG_QUALITY);
    encoder
        .encode_image(&normalized.to_rgb8())
        .context("Failed to encode normalized frame")?;

    Ok(dimensions)
}
