//! Crop session state machine.
//!
//! `Idle → Cropping → Submitted`. Cancelling while cropping returns to
//! `Idle` and drops the picked file along with the pan/zoom state.

use crate::error::{Error, Result};
use crate::geometry::{
    clamp_zoom, crop_rect, fit_image, CropRect, DragTracker, ImageSize, RenderedGeometry,
    Transform,
};
use crate::render::{extract_crop, image_dimensions, CroppedFile, PickedFile};
use crate::viewport::{fit_viewport, Aspect, ViewportSize};
use fairway_common::MediaClass;

/// Coarse session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CropState {
    Idle,
    Cropping,
    Submitted,
}

impl CropState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cropping => "cropping",
            Self::Submitted => "submitted",
        }
    }
}

/// Layout the session needs to size its viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub width: f64,
    pub available_height: f64,
}

struct Active {
    file: PickedFile,
    image: ImageSize,
    viewport: ViewportSize,
    zoom: f64,
    transform: Transform,
}

/// One pass through the crop overlay for a single picked image.
pub struct CropSession {
    state: CropState,
    aspect: Aspect,
    container: Container,
    drag: DragTracker,
    active: Option<Active>,
}

impl CropSession {
    pub fn new(container: Container) -> Self {
        Self {
            state: CropState::Idle,
            aspect: Aspect::default(),
            container,
            drag: DragTracker::new(),
            active: None,
        }
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    pub fn viewport(&self) -> Option<ViewportSize> {
        self.active.as_ref().map(|a| a.viewport)
    }

    pub fn transform(&self) -> Option<Transform> {
        self.active.as_ref().map(|a| a.transform)
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.active.as_ref().map(|a| a.image)
    }

    fn expect_state(&self, expected: CropState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    fn active_mut(&mut self) -> Result<&mut Active> {
        let found = self.state.name();
        self.active.as_mut().ok_or(Error::InvalidState {
            expected: CropState::Cropping.name(),
            found,
        })
    }

    /// Open the cropper on an image file, resetting zoom and pan.
    pub fn open(&mut self, file: PickedFile) -> Result<()> {
        self.expect_state(CropState::Idle)?;
        if MediaClass::from_content_type(&file.content_type) != MediaClass::Image {
            return Err(Error::NotAnImage(file.content_type));
        }

        let image = image_dimensions(&file.bytes)?;
        let viewport = fit_viewport(
            self.container.width,
            self.container.available_height,
            self.aspect,
        );
        let transform = fit_image(viewport, image, 1.0, (0.0, 0.0));

        self.active = Some(Active {
            file,
            image,
            viewport,
            zoom: 1.0,
            transform,
        });
        self.drag.pointer_up();
        self.state = CropState::Cropping;
        Ok(())
    }

    /// Change the aspect ratio; invalid strings keep the current one.
    ///
    /// Resizes the viewport and recenters the image.
    pub fn set_aspect(&mut self, aspect: &str) -> Result<()> {
        self.expect_state(CropState::Cropping)?;
        self.aspect = self.aspect.parse_or_keep(aspect);
        let (container, aspect) = (self.container, self.aspect);

        let active = self.active_mut()?;
        active.viewport = fit_viewport(container.width, container.available_height, aspect);
        active.transform = fit_image(active.viewport, active.image, active.zoom, (0.0, 0.0));
        Ok(())
    }

    /// Set the zoom factor (clamped to `[1, 3]`), keeping the current pan.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        self.expect_state(CropState::Cropping)?;
        let active = self.active_mut()?;
        active.zoom = clamp_zoom(zoom);
        let offset = (active.transform.offset_x, active.transform.offset_y);
        active.transform = fit_image(active.viewport, active.image, active.zoom, offset);
        Ok(())
    }

    /// Re-layout after the container changed size, keeping the current pan.
    pub fn resize(&mut self, container: Container) -> Result<()> {
        self.container = container;
        if self.state != CropState::Cropping {
            return Ok(());
        }
        let aspect = self.aspect;
        let active = self.active_mut()?;
        active.viewport = fit_viewport(container.width, container.available_height, aspect);
        let offset = (active.transform.offset_x, active.transform.offset_y);
        active.transform = fit_image(active.viewport, active.image, active.zoom, offset);
        Ok(())
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if self.state == CropState::Cropping {
            self.drag.pointer_down(x, y);
        }
    }

    /// Pan by the pointer's movement since the last event and re-clamp.
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let Some((dx, dy)) = self.drag.pointer_move(x, y) else {
            return;
        };
        if let Some(active) = self.active.as_mut() {
            let offset = (active.transform.offset_x + dx, active.transform.offset_y + dy);
            active.transform = fit_image(active.viewport, active.image, active.zoom, offset);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    /// Current crop rectangle in source image pixels.
    pub fn crop_rect(&self, rendered: Option<RenderedGeometry>) -> Result<CropRect> {
        self.expect_state(CropState::Cropping)?;
        let active = self.active.as_ref().ok_or(Error::InvalidState {
            expected: CropState::Cropping.name(),
            found: self.state.name(),
        })?;
        Ok(crop_rect(
            active.image,
            active.viewport,
            active.transform,
            rendered,
        ))
    }

    /// Produce the cropped file and move to `Submitted`.
    ///
    /// An empty crop rectangle closes the overlay (back to `Idle`) and
    /// returns `Ok(None)`.
    pub fn confirm(&mut self, rendered: Option<RenderedGeometry>) -> Result<Option<CroppedFile>> {
        let rect = self.crop_rect(rendered)?;
        if rect.is_empty() {
            self.cancel();
            return Ok(None);
        }

        let active = self.active.as_ref().ok_or(Error::EmptyCrop)?;
        let cropped = extract_crop(&active.file, rect)?;
        self.active = None;
        self.drag.pointer_up();
        self.state = CropState::Submitted;
        Ok(Some(cropped))
    }

    /// Abandon the crop, discarding the file and pan/zoom state.
    pub fn cancel(&mut self) {
        if self.state == CropState::Cropping {
            self.active = None;
            self.drag.pointer_up();
            self.state = CropState::Idle;
        }
    }

    /// Return a submitted session to `Idle` once the upload finished.
    pub fn reset(&mut self) {
        self.active = None;
        self.drag.pointer_up();
        self.state = CropState::Idle;
    }
}
