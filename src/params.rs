//! Per-request query parameters.
//!
//! Only the first value of a repeated parameter is used. Parsing helpers
//! return `None` for absent or malformed values; callers treat that as
//! "not requested" rather than as an error.

use std::collections::HashMap;
use std::num::IntErrorKind;

/// Target width in pixels.
pub const WIDTH: &str = "width";
/// Target height in pixels.
pub const HEIGHT: &str = "height";
/// Center crop, `{width},{height}`.
pub const CROP: &str = "crop";
/// Resampling filter.
pub const RESIZE_FILTER: &str = "resize-filter";
/// Fit mode when both dimensions are given.
pub const FIT: &str = "fit";
/// Orientation code.
pub const ORIENT: &str = "orient";
/// Gaussian blur sigma.
pub const BLUR: &str = "blur";
/// Output format.
pub const FORMAT: &str = "format";
/// JPEG quality.
pub const QUALITY: &str = "quality";
/// Upstream URL for the proxy backend.
pub const URL: &str = "url";

/// First value of each query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Collect parameters from decoded pairs; the first occurrence wins.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut values = HashMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            values.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Self { values }
    }

    /// Parse a raw query string.
    pub fn parse(query: &str) -> Self {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_pairs(&pairs)
    }

    /// The value of `key`, if present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The value of `key` as a strictly positive integer no larger than `max`.
    ///
    /// Integers too large for any machine type still clamp to `max`.
    pub fn clamped_u32(&self, key: &str, max: u32) -> Option<u32> {
        let value = match self.get(key)?.parse::<u64>() {
            Ok(value) => value,
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => u64::MAX,
            Err(_) => return None,
        };
        if value == 0 {
            return None;
        }
        Some(value.min(u64::from(max)) as u32)
    }
}
