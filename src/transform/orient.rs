use image::DynamicImage;

/// Rotation or mirroring applied after resizing.
///
/// Accepts the letter codes `r`, `l`, `h`, `v`, `hv`/`vh` and the EXIF
/// orientation values 1 to 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    /// Mirror across the top-left to bottom-right diagonal (EXIF 5)
    Transpose,
    /// Mirror across the top-right to bottom-left diagonal (EXIF 7)
    Transverse,
}

impl Orientation {
    /// Parse an orientation code. `1` and unknown codes mean no change.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "r" | "6" => Some(Orientation::Rotate90),
            "l" | "8" => Some(Orientation::Rotate270),
            "h" | "2" => Some(Orientation::FlipHorizontal),
            "v" | "4" => Some(Orientation::FlipVertical),
            "hv" | "vh" | "3" => Some(Orientation::Rotate180),
            "5" => Some(Orientation::Transpose),
            "7" => Some(Orientation::Transverse),
            _ => None,
        }
    }

    pub fn apply(&self, img: &DynamicImage) -> DynamicImage {
        match self {
            Orientation::Rotate90 => img.rotate90(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::Rotate270 => img.rotate270(),
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Transpose => img.fliph().rotate270(),
            Orientation::Transverse => img.fliph().rotate90(),
        }
    }
}
