//! Viewport sizing for the crop overlay.
//!
//! The viewport takes the container's full width at the chosen aspect ratio
//! unless that would be taller than the available height, in which case it
//! is capped by height instead.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Container width assumed when the real width is unknown (zero).
pub const FALLBACK_CONTAINER_WIDTH: f64 = 640.0;

/// Available height never drops below this, in CSS pixels.
pub const MIN_AVAILABLE_HEIGHT: f64 = 100.0;

/// Vertical padding inside the overlay, top and bottom combined.
pub const OVERLAY_PADDING: f64 = 32.0;

/// Width-to-height ratio of the crop viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Aspect(f64);

impl Aspect {
    /// Create an aspect from a positive, finite ratio.
    pub fn new(ratio: f64) -> Option<Self> {
        (ratio.is_finite() && ratio > 0.0).then_some(Self(ratio))
    }

    pub fn ratio(self) -> f64 {
        self.0
    }

    /// Parse `s`, keeping `self` when it is not a valid aspect.
    pub fn parse_or_keep(self, s: &str) -> Self {
        s.parse().unwrap_or(self)
    }
}

impl Default for Aspect {
    /// Portrait 3:4, the usual shape of a hole diagram.
    fn default() -> Self {
        Self(3.0 / 4.0)
    }
}

impl FromStr for Aspect {
    type Err = Error;

    /// Accepts `"a:b"` with both sides positive, or a positive decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let ratio = match s.split_once(':') {
            Some((a, b)) => {
                let a: f64 = a.trim().parse().map_err(|_| Error::invalid_aspect(s))?;
                let b: f64 = b.trim().parse().map_err(|_| Error::invalid_aspect(s))?;
                if !(a > 0.0 && b > 0.0) {
                    return Err(Error::invalid_aspect(s));
                }
                a / b
            }
            None => s.parse().map_err(|_| Error::invalid_aspect(s))?,
        };
        Self::new(ratio).ok_or_else(|| Error::invalid_aspect(s))
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Size of the crop viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Height left for the viewport once the overlay's controls are laid out.
pub fn available_height(overlay_height: f64, controls_height: f64, actions_height: f64) -> f64 {
    (overlay_height - controls_height - actions_height - OVERLAY_PADDING).max(MIN_AVAILABLE_HEIGHT)
}

/// Size the viewport for a container and aspect ratio.
pub fn fit_viewport(container_width: f64, available_height: f64, aspect: Aspect) -> ViewportSize {
    let max_width = if container_width > 0.0 {
        container_width
    } else {
        FALLBACK_CONTAINER_WIDTH
    };
    let available_height = available_height.max(MIN_AVAILABLE_HEIGHT);

    let height_from_width = (max_width / aspect.ratio()).round();
    if height_from_width > available_height {
        ViewportSize::new((available_height * aspect.ratio()).round(), available_height)
    } else {
        ViewportSize::new(max_width, height_from_width)
    }
}
