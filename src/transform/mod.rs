//! Image transforms driven by query parameters.
//!
//! Steps run in a fixed order regardless of parameter order:
//!
//! ```text
//! decoded image
//!      │
//!      ▼
//!   crop ──► resize ──► orient ──► blur
//!                                    │
//!                                    ▼
//!                              encoder
//! ```
//!
//! A malformed parameter disables its step; it never fails the request.

mod crop;
mod orient;
mod resize;

pub use crop::Crop;
pub use orient::Orientation;
pub use resize::{FitMode, Resize, ResizeFilter, MAX_DIMENSION};

use image::DynamicImage;
use tokio_util::sync::CancellationToken;

use crate::error::ImageError;
use crate::params::{QueryParams, BLUR, CROP, ORIENT};

/// Largest gaussian blur sigma; larger requests are clamped to it.
pub const MAX_BLUR_SIGMA: f32 = 100.0;

/// The transform steps requested for one image.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformOptions {
    pub crop: Option<Crop>,
    pub resize: Option<Resize>,
    pub orientation: Option<Orientation>,
    pub blur: Option<f32>,
}

impl TransformOptions {
    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            crop: params.get(CROP).and_then(Crop::parse),
            resize: Resize::from_query(params),
            orientation: params.get(ORIENT).and_then(Orientation::parse),
            blur: params.get(BLUR).and_then(parse_sigma),
        }
    }

    /// True when no step would change the image.
    pub fn is_identity(&self) -> bool {
        self.crop.is_none()
            && self.resize.is_none()
            && self.orientation.is_none()
            && self.blur.is_none()
    }

    /// Run every requested step, checking `cancel` between steps.
    pub fn apply(
        &self,
        img: DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<DynamicImage, ImageError> {
        let original = (img.width(), img.height());
        let mut img = img;

        if let Some(crop) = &self.crop {
            check_cancelled(cancel)?;
            img = crop.apply(&img);
        }

        if let Some(resize) = &self.resize {
            check_cancelled(cancel)?;
            img = resize.apply(img, original)?;
        }

        if let Some(orientation) = &self.orientation {
            check_cancelled(cancel)?;
            img = orientation.apply(&img);
        }

        if let Some(sigma) = self.blur {
            check_cancelled(cancel)?;
            img = img.blur(sigma);
        }

        Ok(img)
    }
}

fn parse_sigma(value: &str) -> Option<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|sigma| sigma.is_normal() && *sigma > 0.0)
        .map(|sigma| sigma.min(MAX_BLUR_SIGMA))
}

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), ImageError> {
    if cancel.is_cancelled() {
        Err(ImageError::Cancelled)
    } else {
        Ok(())
    }
}
