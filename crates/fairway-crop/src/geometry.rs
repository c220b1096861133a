//! Fit, zoom, pan, and crop-rectangle math.
//!
//! The image is drawn centered in the viewport at `scale`, shifted by
//! `(offset_x, offset_y)` CSS pixels. The base scale makes the image cover
//! the viewport; zoom multiplies it. Offsets are clamped so the image never
//! leaves empty space inside the viewport.

use crate::viewport::ViewportSize;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// Clamp a zoom factor to `[1, 3]`; non-finite input resets to 1.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        MIN_ZOOM
    }
}

/// Natural pixel size of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions as floats, with zero treated as one.
    fn as_f64(self) -> (f64, f64) {
        (f64::from(self.width.max(1)), f64::from(self.height.max(1)))
    }
}

/// Placement of the image within the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// Compute the transform for an image in a viewport.
///
/// `offset` is the requested pan; it is clamped per axis to
/// `±max(0, scaled/2 - viewport/2)`.
pub fn fit_image(
    viewport: ViewportSize,
    image: ImageSize,
    zoom: f64,
    offset: (f64, f64),
) -> Transform {
    let (w0, h0) = image.as_f64();
    let base_scale = (viewport.width / w0).max(viewport.height / h0);
    let scale = base_scale * clamp_zoom(zoom);

    let max_x = ((w0 * scale) / 2.0 - viewport.width / 2.0).max(0.0);
    let max_y = ((h0 * scale) / 2.0 - viewport.height / 2.0).max(0.0);

    Transform {
        scale,
        offset_x: offset.0.clamp(-max_x, max_x),
        offset_y: offset.1.clamp(-max_y, max_y),
    }
}

/// Axis-aligned rectangle in CSS pixels, as reported by layout.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_empty(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Measured on-screen rectangles of the painted image and the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderedGeometry {
    pub image: Rect,
    pub viewport: Rect,
}

/// Region of the source image to keep, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies within an image of the given size.
    pub fn fits_within(&self, image: ImageSize) -> bool {
        u64::from(self.left) + u64::from(self.width) <= u64::from(image.width)
            && u64::from(self.top) + u64::from(self.height) <= u64::from(image.height)
    }
}

fn to_pixels(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Map the viewport back onto the source image.
///
/// Measured geometry is preferred when every rectangle is non-empty; the
/// analytic scale/offset model is the fallback. The result is clamped to
/// the image bounds.
pub fn crop_rect(
    image: ImageSize,
    viewport: ViewportSize,
    transform: Transform,
    rendered: Option<RenderedGeometry>,
) -> CropRect {
    match rendered {
        Some(geometry) if !geometry.image.is_empty() && !geometry.viewport.is_empty() => {
            measured_crop_rect(image, geometry)
        }
        _ => analytic_crop_rect(image, viewport, transform),
    }
}

fn measured_crop_rect(image: ImageSize, geometry: RenderedGeometry) -> CropRect {
    let (w0, h0) = (f64::from(image.width), f64::from(image.height));
    let css_to_img_x = w0 / geometry.image.width;
    let css_to_img_y = h0 / geometry.image.height;

    let rel_left = geometry.viewport.left - geometry.image.left;
    let rel_top = geometry.viewport.top - geometry.image.top;

    let left = (rel_left * css_to_img_x).round().clamp(0.0, (w0 - 1.0).max(0.0));
    let top = (rel_top * css_to_img_y).round().clamp(0.0, (h0 - 1.0).max(0.0));
    let width = (geometry.viewport.width * css_to_img_x)
        .round()
        .min(w0 - left)
        .max(0.0);
    let height = (geometry.viewport.height * css_to_img_y)
        .round()
        .min(h0 - top)
        .max(0.0);

    CropRect {
        left: to_pixels(left),
        top: to_pixels(top),
        width: to_pixels(width),
        height: to_pixels(height),
    }
}

fn analytic_crop_rect(image: ImageSize, viewport: ViewportSize, transform: Transform) -> CropRect {
    let (w0, h0) = (f64::from(image.width), f64::from(image.height));
    let s = if transform.scale > 0.0 { transform.scale } else { 1.0 };
    let (vw, vh) = (viewport.width, viewport.height);
    let (dx, dy) = (transform.offset_x, transform.offset_y);

    let u0 = w0 / 2.0 + (-vw / 2.0 - dx) / s;
    let v0 = h0 / 2.0 + (-vh / 2.0 - dy) / s;
    let u1 = w0 / 2.0 + (vw / 2.0 - dx) / s;
    let v1 = h0 / 2.0 + (vh / 2.0 - dy) / s;

    let left = u0.clamp(0.0, w0);
    let top = v0.clamp(0.0, h0);
    let right = u1.clamp(0.0, w0);
    let bottom = v1.clamp(0.0, h0);

    let mut rect = CropRect {
        left: to_pixels(left),
        top: to_pixels(top),
        width: to_pixels(right - left),
        height: to_pixels(bottom - top),
    };

    // Independent rounding of origin and size can overshoot by one pixel.
    rect.width = rect.width.min(image.width.saturating_sub(rect.left));
    rect.height = rect.height.min(image.height.saturating_sub(rect.top));
    rect
}

/// Turns absolute pointer positions into per-move deltas.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    last: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.last = Some((x, y));
    }

    /// Delta since the previous position, or `None` when not dragging.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (last_x, last_y) = self.last?;
        self.last = Some((x, y));
        Some((x - last_x, y - last_y))
    }

    pub fn pointer_up(&mut self) {
        self.last = None;
    }
}
