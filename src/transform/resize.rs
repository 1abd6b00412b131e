use std::num::NonZeroU32;

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{DynamicImage, RgbaImage};

use crate::error::ImageError;
use crate::params::{QueryParams, FIT, HEIGHT, RESIZE_FILTER, WIDTH};

/// Largest width or height a resize may target.
pub const MAX_DIMENSION: u32 = 8192;

/// Resampling filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeFilter {
    #[default]
    Lanczos,
    Nearest,
    Linear,
    MitchellNetravali,
    Box,
}

impl ResizeFilter {
    /// Parse a filter name; unknown names fall back to Lanczos.
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some("nearest") => ResizeFilter::Nearest,
            Some("linear") => ResizeFilter::Linear,
            Some("mitchell-netravali") | Some("netravali") => ResizeFilter::MitchellNetravali,
            Some("box") => ResizeFilter::Box,
            _ => ResizeFilter::Lanczos,
        }
    }

    fn algorithm(self) -> ResizeAlg {
        match self {
            ResizeFilter::Lanczos => ResizeAlg::Convolution(FilterType::Lanczos3),
            ResizeFilter::Nearest => ResizeAlg::Nearest,
            ResizeFilter::Linear => ResizeAlg::Convolution(FilterType::Bilinear),
            ResizeFilter::MitchellNetravali => ResizeAlg::Convolution(FilterType::Mitchell),
            ResizeFilter::Box => ResizeAlg::Convolution(FilterType::Box),
        }
    }
}

/// How to resize when both dimensions are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Exactly the requested size, aspect ignored
    Cover,
    /// Uniform scale to fit inside the requested box
    Bounds,
}

impl FitMode {
    pub fn parse(name: Option<&str>) -> Option<Self> {
        match name? {
            "cover" => Some(FitMode::Cover),
            "bounds" => Some(FitMode::Bounds),
            _ => None,
        }
    }
}

/// A resize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub filter: ResizeFilter,
    pub fit: Option<FitMode>,
}

impl Resize {
    /// Read width, height, filter and fit; `None` when no dimension is set.
    pub fn from_query(params: &QueryParams) -> Option<Self> {
        let width = params.clamped_u32(WIDTH, MAX_DIMENSION);
        let height = params.clamped_u32(HEIGHT, MAX_DIMENSION);
        if width.is_none() && height.is_none() {
            return None;
        }

        Some(Self {
            width,
            height,
            filter: ResizeFilter::parse(params.get(RESIZE_FILTER)),
            fit: FitMode::parse(params.get(FIT)),
        })
    }

    /// Output size for an image currently `current` in size whose source was
    /// `original` before any crop. `None` leaves the image unchanged.
    pub fn target_dimensions(&self, current: (u32, u32), original: (u32, u32)) -> Option<(u32, u32)> {
        let (cur_w, cur_h) = current;
        if cur_w == 0 || cur_h == 0 {
            return None;
        }

        match (self.width, self.height, self.fit) {
            (Some(w), Some(h), Some(FitMode::Cover)) => Some((w, h)),
            (Some(w), Some(h), Some(FitMode::Bounds)) => {
                let scale = f64::min(w as f64 / cur_w as f64, h as f64 / cur_h as f64);
                Some((scale_dimension(cur_w, scale), scale_dimension(cur_h, scale)))
            }
            (Some(w), _, _) => {
                if w > original.0 {
                    return None;
                }
                let scale = w as f64 / cur_w as f64;
                Some((w, scale_dimension(cur_h, scale)))
            }
            (None, Some(h), _) => {
                if h > original.1 {
                    return None;
                }
                let scale = h as f64 / cur_h as f64;
                Some((scale_dimension(cur_w, scale), h))
            }
            (None, None, _) => None,
        }
    }

    /// Resize `img`; `original` is the source size before cropping.
    pub fn apply(&self, img: DynamicImage, original: (u32, u32)) -> Result<DynamicImage, ImageError> {
        match self.target_dimensions((img.width(), img.height()), original) {
            Some((w, h)) if (w, h) != (img.width(), img.height()) => {
                resample(&img, w, h, self.filter)
            }
            _ => Ok(img),
        }
    }
}

fn scale_dimension(dimension: u32, scale: f64) -> u32 {
    ((dimension as f64 * scale).round() as u32).clamp(1, MAX_DIMENSION)
}

fn resample(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
    filter: ResizeFilter,
) -> Result<DynamicImage, ImageError> {
    let dimension = |value: u32, what: &str| {
        NonZeroU32::new(value).ok_or_else(|| ImageError::Transform(format!("{} is 0", what)))
    };
    let src_width = dimension(img.width(), "source width")?;
    let src_height = dimension(img.height(), "source height")?;
    let dst_width = dimension(target_w, "target width")?;
    let dst_height = dimension(target_h, "target height")?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::Transform(format!("invalid source buffer: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(filter.algorithm());
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::Transform(format!("resize failed: {:?}", e)))?;

    let rgba = RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::Transform("resized buffer has wrong size".to_string()))?;

    if img.color().has_alpha() {
        Ok(DynamicImage::ImageRgba8(rgba))
    } else {
        Ok(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()))
    }
}
