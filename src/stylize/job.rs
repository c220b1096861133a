//! One stylization run for a hole.
//!
//! The source is the given upload when it has a blob, otherwise the hole's
//! legacy layout. Errors never escape [`Stylizer::run`]: they are recorded
//! on the upload and the hole and reported as a [`StylizeOutcome`].

use std::sync::Arc;

use anyhow::Context;
use fairway_common::{HoleId, HoleImageId, ImageStatus, StylizationStatus};
use fairway_db::models::{Attachment, HoleImage, NewHoleImage};
use fairway_db::pool::{get_conn, DbPool};
use fairway_db::queries::{courses, hole_images, holes};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::generation::ImageGenerator;
use crate::images::hooks;
use crate::images::storage::AttachmentStore;
use crate::state::EventBus;

/// Recorded when the generator answers without an image.
pub const NO_IMAGE_MESSAGE: &str = "No image data returned";

const DEFAULT_INPUT_TYPE: &str = "image/png";
const OUTPUT_TYPE: &str = "image/png";
const OUTPUT_FILENAME: &str = "styled.png";

/// Request to stylize a hole's upload, or its legacy layout when `image_id` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylizeJob {
    pub hole_id: HoleId,
    pub image_id: Option<HoleImageId>,
}

impl StylizeJob {
    pub fn for_upload(hole_id: HoleId, image_id: HoleImageId) -> Self {
        Self {
            hole_id,
            image_id: Some(image_id),
        }
    }

    pub fn for_layout(hole_id: HoleId) -> Self {
        Self {
            hole_id,
            image_id: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylizeOutcome {
    /// A stylized rendition was stored. `stylized_id` is the derived image,
    /// or `None` on the legacy layout path.
    Completed { stylized_id: Option<HoleImageId> },
    /// The generator produced nothing; the target is marked failed.
    NoImage,
    /// The run errored; the target is marked failed with this message.
    Failed(String),
    /// Nothing to stylize.
    Skipped,
}

enum Source {
    Upload(HoleImage, Attachment),
    Layout(Attachment),
}

impl Source {
    fn attachment(&self) -> &Attachment {
        match self {
            Self::Upload(_, a) | Self::Layout(a) => a,
        }
    }

    fn upload_id(&self) -> Option<HoleImageId> {
        match self {
            Self::Upload(image, _) => Some(image.id),
            Self::Layout(_) => None,
        }
    }
}

enum Produced {
    Derived(HoleImageId),
    Layout,
    Nothing,
}

/// Runs stylization jobs against the database, blob store, and generator.
pub struct Stylizer {
    pool: DbPool,
    store: AttachmentStore,
    events: Arc<EventBus>,
    generator: Arc<dyn ImageGenerator>,
}

impl Stylizer {
    pub fn new(
        pool: DbPool,
        store: AttachmentStore,
        events: Arc<EventBus>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            pool,
            store,
            events,
            generator,
        }
    }

    /// Run one job to a terminal state.
    pub async fn run(&self, job: &StylizeJob) -> StylizeOutcome {
        let source = match self.resolve(job) {
            Ok(Some(source)) => source,
            Ok(None) => {
                info!(hole_id = %job.hole_id, image_id = ?job.image_id, "Nothing to stylize");
                return StylizeOutcome::Skipped;
            }
            Err(e) => {
                error!(hole_id = %job.hole_id, error = %e, "Failed to load stylization source");
                return StylizeOutcome::Failed(e.to_string());
            }
        };

        info!(
            hole_id = %job.hole_id,
            image_id = ?source.upload_id(),
            generator = self.generator.name(),
            "Stylizing hole image"
        );

        match self.execute(job.hole_id, &source).await {
            Ok(Produced::Derived(id)) => StylizeOutcome::Completed {
                stylized_id: Some(id),
            },
            Ok(Produced::Layout) => StylizeOutcome::Completed { stylized_id: None },
            Ok(Produced::Nothing) => {
                warn!(hole_id = %job.hole_id, "Stylization returned no image");
                self.mark_failed(job.hole_id, source.upload_id(), NO_IMAGE_MESSAGE);
                StylizeOutcome::NoImage
            }
            Err(e) => {
                let message = e.to_string();
                error!(hole_id = %job.hole_id, error = %message, "Stylization failed");
                self.mark_failed(job.hole_id, source.upload_id(), &message);
                StylizeOutcome::Failed(message)
            }
        }
    }

    fn resolve(&self, job: &StylizeJob) -> anyhow::Result<Option<Source>> {
        let conn = get_conn(&self.pool)?;
        let Some(hole) = holes::get_hole(&conn, job.hole_id)? else {
            return Ok(None);
        };

        let upload = match job.image_id {
            Some(id) => hole_images::get_hole_image_in_hole(&conn, hole.id, id)?,
            None => None,
        };
        if let Some(image) = upload {
            if let Some(attachment) = image.attachment.clone() {
                return Ok(Some(Source::Upload(image, attachment)));
            }
        }

        Ok(hole.layout.map(Source::Layout))
    }

    async fn execute(&self, hole_id: HoleId, source: &Source) -> anyhow::Result<Produced> {
        let seed = {
            let conn = get_conn(&self.pool)?;
            if let Some(id) = source.upload_id() {
                hooks::set_status(&conn, &self.events, id, ImageStatus::Processing, None)?;
            }
            hooks::set_hole_status(
                &conn,
                &self.events,
                hole_id,
                StylizationStatus::Processing,
                None,
            )?;
            let hole = holes::get_hole(&conn, hole_id)?.context("hole disappeared")?;
            courses::get_course(&conn, hole.course_id)?.and_then(|c| c.style_seed)
        };

        let attachment = source.attachment();
        let input = self.store.read(&attachment.key)?;
        let mime_type = if attachment.content_type.trim().is_empty() {
            DEFAULT_INPUT_TYPE
        } else {
            attachment.content_type.as_str()
        };

        let output = self.generator.stylize(&input, mime_type, seed).await?;
        let Some(output) = output.filter(|bytes| !bytes.is_empty()) else {
            return Ok(Produced::Nothing);
        };

        match source {
            Source::Upload(original, _) => {
                let (stylized, pin) = self.store.store(&output, OUTPUT_TYPE, OUTPUT_FILENAME)?;
                let conn = get_conn(&self.pool)?;
                let derived =
                    hooks::create_image(&conn, &self.events, &NewHoleImage::derived(original, stylized))?;
                // The run may have raced a redo; only flip the original if needed.
                let current = hole_images::get_hole_image(&conn, original.id)?
                    .context("original deleted during stylization")?;
                if current.status != ImageStatus::Ready {
                    hooks::set_status(&conn, &self.events, original.id, ImageStatus::Ready, None)?;
                }
                hooks::set_hole_status(&conn, &self.events, hole_id, StylizationStatus::Ready, None)?;
                drop(conn);
                drop(pin);
                info!(%hole_id, stylized_id = %derived.id, "Attached stylized hole image");
                Ok(Produced::Derived(derived.id))
            }
            Source::Layout(layout) => {
                let filename = format!("{}_stylized.png", layout.stem());
                let (stylized, pin) = self.store.store(&output, OUTPUT_TYPE, &filename)?;
                let previous = {
                    let conn = get_conn(&self.pool)?;
                    let previous = holes::set_stylized_layout(&conn, hole_id, &stylized)?;
                    hooks::set_hole_status(
                        &conn,
                        &self.events,
                        hole_id,
                        StylizationStatus::Ready,
                        None,
                    )?;
                    previous
                };
                drop(pin);
                hooks::purge_later(
                    self.pool.clone(),
                    self.store.clone(),
                    previous.into_iter().filter(|p| p.key != stylized.key).collect(),
                );
                info!(%hole_id, filename = %filename, "Attached stylized layout");
                Ok(Produced::Layout)
            }
        }
    }

    fn mark_failed(&self, hole_id: HoleId, upload_id: Option<HoleImageId>, message: &str) {
        let conn = match get_conn(&self.pool) {
            Ok(conn) => conn,
            Err(e) => {
                error!(%hole_id, error = %e, "Could not record stylization failure");
                return;
            }
        };
        if let Err(e) = hooks::set_hole_status(
            &conn,
            &self.events,
            hole_id,
            StylizationStatus::Failed,
            Some(message),
        ) {
            error!(%hole_id, error = %e, "Could not mark hole failed");
        }
        if let Some(id) = upload_id {
            if let Err(e) =
                hooks::set_status(&conn, &self.events, id, ImageStatus::Failed, Some(message))
            {
                error!(%hole_id, image_id = %id, error = %e, "Could not mark upload failed");
            }
        }
    }
}
