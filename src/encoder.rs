//! Output encoding.
//!
//! The output format is chosen per request:
//!
//! 1. an explicit `format` parameter (`jpeg`, `png`, `gif`),
//! 2. otherwise the format the source was decoded from, if it is one of those,
//! 3. otherwise JPEG.
//!
//! JPEG honours the `quality` parameter, PNG always uses the best compression
//! and GIF uses the encoder defaults.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use tokio_util::sync::CancellationToken;

use crate::error::ImageError;
use crate::params::{QueryParams, FORMAT, QUALITY};
use crate::transform::{check_cancelled, TransformOptions};

/// JPEG quality used when none (or an invalid one) is requested.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Output Format
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    /// Pick the output format from the `format` parameter, then the source
    /// format, then JPEG.
    pub fn select(format_param: Option<&str>, source: Option<ImageFormat>) -> Self {
        format_param
            .and_then(Self::from_name)
            .or_else(|| source.and_then(Self::from_image_format))
            .unwrap_or(OutputFormat::Jpeg)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "gif" => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }
}

/// Encoded output ready to be written to the response.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub content_type: &'static str,
    pub data: Bytes,
}

// =============================================================================
// Encoding
// =============================================================================

/// Parse the `quality` parameter. Zero or unparsable values use the default,
/// anything else is clamped to 1..=100.
pub fn jpeg_quality(param: Option<&str>) -> u8 {
    match param.and_then(|q| q.trim().parse::<i64>().ok()) {
        None | Some(0) => DEFAULT_JPEG_QUALITY,
        Some(q) => q.clamp(MIN_JPEG_QUALITY as i64, MAX_JPEG_QUALITY as i64) as u8,
    }
}

/// Encode `img` as `format`.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality_param: Option<&str>,
) -> Result<EncodedImage, ImageError> {
    let mut output = Vec::new();
    let encode_err = |e: image::ImageError| ImageError::Encode(e.to_string());

    match format {
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut output, jpeg_quality(quality_param))
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(encode_err)?;
        }
        OutputFormat::Png => {
            let rgba = img.to_rgba8();
            PngEncoder::new_with_quality(&mut output, CompressionType::Best, FilterType::Adaptive)
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(encode_err)?;
        }
        OutputFormat::Gif => {
            let rgba = img.to_rgba8();
            // The trailer is written when the encoder is dropped.
            let mut encoder = GifEncoder::new(&mut output);
            encoder
                .encode(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(encode_err)?;
        }
    }

    Ok(EncodedImage {
        content_type: format.content_type(),
        data: Bytes::from(output),
    })
}

// =============================================================================
// Pipeline
// =============================================================================

/// Decode `source`, returning the image and the format it was sniffed as.
pub fn decode(source: &[u8]) -> Result<(DynamicImage, Option<ImageFormat>), ImageError> {
    let reader = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let format = reader.format();
    let img = reader
        .decode()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Decode, transform and re-encode one image according to `params`.
///
/// CPU bound; callers on the async runtime run it on a blocking thread.
pub fn process(
    source: &[u8],
    params: &QueryParams,
    cancel: &CancellationToken,
) -> Result<EncodedImage, ImageError> {
    let (img, source_format) = decode(source)?;

    let options = TransformOptions::from_query(params);
    let img = if options.is_identity() {
        img
    } else {
        options.apply(img, cancel)?
    };

    check_cancelled(cancel)?;
    let format = OutputFormat::select(params.get(FORMAT), source_format);
    encode(&img, format, params.get(QUALITY))
}

// =============================================================================
// Tests
// =============================================================================
