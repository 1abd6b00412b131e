use image::DynamicImage;

/// Center-anchored crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
}

impl Crop {
    /// Parse `{width},{height}`; anything else is not a crop.
    pub fn parse(value: &str) -> Option<Self> {
        let (width, height) = value.split_once(',')?;
        let width = width.trim().parse::<u32>().ok().filter(|w| *w > 0)?;
        let height = height.trim().parse::<u32>().ok().filter(|h| *h > 0)?;
        Some(Self { width, height })
    }

    /// Cut a `width` x `height` rectangle around the image center, clamped to
    /// the image bounds.
    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        let (x, width) = centered_span(img.width(), self.width);
        let (y, height) = centered_span(img.height(), self.height);
        img.crop_imm(x, y, width, height)
    }
}

/// Offset and length of a span of `len` centered within `total`.
fn centered_span(total: u32, len: u32) -> (u32, u32) {
    let start = (total / 2).saturating_sub(len / 2);
    (start, len.min(total - start))
}
