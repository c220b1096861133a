//! Fairway-Crop: crop/zoom geometry for hole image uploads
//!
//! This crate holds the math and state behind the upload cropper: deciding
//! whether a picked file is cropped at all, sizing the viewport, fitting and
//! panning the image, mapping the viewport back to source pixels, and
//! producing the cropped file.
//!
//! # Modules
//!
//! - `pick` - Size limit and image/video/unknown classification
//! - `viewport` - Aspect ratios and viewport sizing
//! - `geometry` - Fit/zoom/pan transform, crop rectangle, pointer deltas
//! - `session` - `Idle → Cropping → Submitted` state machine
//! - `render` - Decode, crop, downsize, and re-encode
//!
//! # Example
//!
//! ```
//! use fairway_crop::{fit_image, crop_rect, fit_viewport, Aspect, ImageSize};
//!
//! let viewport = fit_viewport(300.0, 1000.0, Aspect::default());
//! let image = ImageSize::new(1200, 1600);
//! let transform = fit_image(viewport, image, 1.0, (0.0, 0.0));
//! let rect = crop_rect(image, viewport, transform, None);
//! assert!(rect.fits_within(image));
//! ```

pub mod error;
pub mod geometry;
pub mod pick;
pub mod render;
pub mod session;
pub mod viewport;

pub use error::{Error, Result};
pub use geometry::{
    clamp_zoom, crop_rect, fit_image, CropRect, DragTracker, ImageSize, Rect, RenderedGeometry,
    Transform,
};
pub use pick::{classify_pick, PickDecision, SIZE_LIMIT_MESSAGE};
pub use render::{extract_crop, image_dimensions, CroppedFile, PickedFile};
pub use session::{Container, CropSession, CropState};
pub use viewport::{available_height, fit_viewport, Aspect, ViewportSize};
