//! Hole image operations behind the HTTP surface and the CLI.
//!
//! Input is validated synchronously; only accepted image uploads reach the
//! stylization queue. Database connections are never held across an await.

use std::sync::Arc;

use fairway_common::{
    CourseId, Error, HoleId, HoleImageId, ImageStatus, MediaClass, Result, UserId, VoteValue,
};
use fairway_crop::SIZE_LIMIT_MESSAGE;
use fairway_db::models::{Attachment, Course, Hole, HoleImage, NewHoleImage};
use fairway_db::pool::{get_conn, DbPool, PooledConnection};
use fairway_db::queries::courses::{self, NewCourse};
use fairway_db::queries::{hole_images, holes, votes};
use rand::Rng;
use tracing::{debug, info};

use super::hooks;
use super::selection::{display_candidates, pick_weighted};
use super::storage::{AttachmentStore, BlobPin};
use crate::state::EventBus;
use crate::stylize::{StylizeJob, StylizeQueue};

pub const MISSING_FILE_MESSAGE: &str = "Please choose a file to upload.";
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Only image and video uploads are supported.";
pub const NOT_AN_IMAGE_MESSAGE: &str = "Only images can be stylized.";
pub const REDO_FORBIDDEN_MESSAGE: &str = "You can only redo your own uploads.";
pub const DELETE_FORBIDDEN_MESSAGE: &str = "You can only delete your own uploads.";

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outcome of a vote: the image with its recounted totals.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VoteResult {
    pub image_id: HoleImageId,
    pub value: VoteValue,
    pub upvotes_count: i64,
    pub downvotes_count: i64,
    pub score: f64,
}

#[derive(Clone)]
pub struct HoleImageService {
    pool: DbPool,
    store: AttachmentStore,
    events: Arc<EventBus>,
    queue: StylizeQueue,
    max_upload_bytes: u64,
}

impl HoleImageService {
    pub fn new(
        pool: DbPool,
        store: AttachmentStore,
        events: Arc<EventBus>,
        queue: StylizeQueue,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            pool,
            store,
            events,
            queue,
            max_upload_bytes,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn conn(&self) -> Result<PooledConnection> {
        get_conn(&self.pool)
    }

    fn validate_file(&self, file: &UploadedFile) -> Result<MediaClass> {
        if file.bytes.is_empty() {
            return Err(Error::invalid_input(MISSING_FILE_MESSAGE));
        }
        if file.bytes.len() as u64 > self.max_upload_bytes {
            return Err(Error::payload_too_large(SIZE_LIMIT_MESSAGE));
        }
        match MediaClass::from_content_type(&file.content_type) {
            MediaClass::Other => Err(Error::invalid_input(UNSUPPORTED_TYPE_MESSAGE)),
            class => Ok(class),
        }
    }

    fn store_file(&self, file: &UploadedFile) -> Result<(Attachment, BlobPin)> {
        self.store
            .store(&file.bytes, file.content_type.trim(), &file.filename)
            .map_err(|e| Error::internal(format!("{e:#}")))
    }

    // ------------------------------------------------------------------
    // Courses and holes
    // ------------------------------------------------------------------

    /// Create a course with its holes. A course without a style seed gets a
    /// random one so its holes stylize consistently.
    pub fn create_course(&self, new: &NewCourse, num_holes: i64) -> Result<Course> {
        let mut new = new.clone();
        if new.style_seed.is_none() {
            new.style_seed = Some(rand::thread_rng().gen_range(1..=i64::from(i32::MAX)));
        }
        let course = courses::create_course(&*self.conn()?, &new, num_holes)?;
        info!(course_id = %course.id, name = %course.name, "Created course");
        Ok(course)
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        courses::list_courses(&*self.conn()?)
    }

    pub fn course_with_holes(&self, course_id: CourseId) -> Result<(Course, Vec<Hole>)> {
        let conn = self.conn()?;
        let course = courses::get_course(&conn, course_id)?
            .ok_or_else(|| Error::not_found(format!("course {course_id}")))?;
        let holes = holes::list_holes(&conn, course_id)?;
        Ok((course, holes))
    }

    pub fn hole(&self, hole_id: HoleId) -> Result<Hole> {
        holes::get_hole(&*self.conn()?, hole_id)?
            .ok_or_else(|| Error::not_found(format!("hole {hole_id}")))
    }

    pub fn hole_by_number(&self, course_id: CourseId, number: i64) -> Result<Hole> {
        holes::get_hole_by_number(&*self.conn()?, course_id, number)?
            .ok_or_else(|| Error::not_found(format!("hole {number} of course {course_id}")))
    }

    pub fn update_hole_details(
        &self,
        hole_id: HoleId,
        par: Option<i64>,
        yardage: Option<i64>,
    ) -> Result<Hole> {
        let conn = self.conn()?;
        holes::update_details(&conn, hole_id, par, yardage)?;
        holes::get_hole(&conn, hole_id)?.ok_or_else(|| Error::not_found(format!("hole {hole_id}")))
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Display candidates for a hole, newest first.
    pub fn display_images(&self, hole_id: HoleId) -> Result<Vec<HoleImage>> {
        let conn = self.conn()?;
        ensure_hole(&conn, hole_id)?;
        Ok(display_candidates(hole_images::list_ready_images(&conn, hole_id)?))
    }

    /// One display image, drawn fresh on every call.
    pub fn pick_display_image<R: Rng + ?Sized>(
        &self,
        hole_id: HoleId,
        rng: &mut R,
    ) -> Result<Option<HoleImage>> {
        let candidates = self.display_images(hole_id)?;
        Ok(pick_weighted(&candidates, rng).cloned())
    }

    /// Most recent uploads and renditions of a hole in any status.
    pub fn recent_images(&self, hole_id: HoleId, limit: usize) -> Result<Vec<HoleImage>> {
        let conn = self.conn()?;
        ensure_hole(&conn, hole_id)?;
        let mut images = hole_images::list_for_hole(&conn, hole_id)?;
        images.truncate(limit);
        Ok(images)
    }

    /// Blob and metadata of a hole image.
    pub fn image_file(&self, image_id: HoleImageId) -> Result<(Attachment, Vec<u8>)> {
        let attachment = hole_images::get_hole_image(&*self.conn()?, image_id)?
            .and_then(|image| image.attachment)
            .ok_or_else(|| Error::not_found(format!("file for hole image {image_id}")))?;
        self.read_blob(attachment)
    }

    /// Blob of a hole's legacy layout or its stylized rendition.
    pub fn layout_file(&self, hole_id: HoleId, stylized: bool) -> Result<(Attachment, Vec<u8>)> {
        let hole = self.hole(hole_id)?;
        let attachment = if stylized {
            hole.stylized_layout
        } else {
            hole.layout
        }
        .ok_or_else(|| Error::not_found(format!("layout for hole {hole_id}")))?;
        self.read_blob(attachment)
    }

    fn read_blob(&self, attachment: Attachment) -> Result<(Attachment, Vec<u8>)> {
        let bytes = self
            .store
            .read(&attachment.key)
            .map_err(|e| Error::not_found(format!("{e:#}")))?;
        Ok((attachment, bytes))
    }

    // ------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------

    /// Accept an upload for a hole.
    ///
    /// Videos are ready as soon as they are stored. Images are stored in
    /// `processing` and handed to the stylization queue.
    pub async fn upload(
        &self,
        hole_id: HoleId,
        user_id: UserId,
        file: UploadedFile,
    ) -> Result<HoleImage> {
        let class = self.validate_file(&file)?;
        ensure_hole(&*self.conn()?, hole_id)?;

        let (attachment, pin) = self.store_file(&file)?;
        let image = {
            let conn = self.conn()?;
            let created =
                hooks::create_image(&conn, &self.events, &NewHoleImage::upload(hole_id, user_id))?;
            let attached = hole_images::attach(&conn, created.id, &attachment)?;
            if class == MediaClass::Video {
                hooks::set_status(&conn, &self.events, attached.id, ImageStatus::Ready, None)?
            } else {
                attached
            }
        };
        drop(pin);

        info!(
            %hole_id,
            image_id = %image.id,
            content_type = %attachment.content_type,
            bytes = attachment.byte_size,
            "Accepted hole upload"
        );

        if class == MediaClass::Image {
            self.enqueue(StylizeJob::for_upload(hole_id, image.id)).await?;
        }
        Ok(image)
    }

    /// Replace a hole's legacy layout and stylize it.
    pub async fn upload_layout(&self, hole_id: HoleId, file: UploadedFile) -> Result<Hole> {
        if self.validate_file(&file)? != MediaClass::Image {
            return Err(Error::invalid_input(NOT_AN_IMAGE_MESSAGE));
        }
        ensure_hole(&*self.conn()?, hole_id)?;

        let (attachment, pin) = self.store_file(&file)?;
        let (hole, previous) = {
            let conn = self.conn()?;
            let previous = holes::set_layout(&conn, hole_id, &attachment)?;
            let hole = holes::get_hole(&conn, hole_id)?
                .ok_or_else(|| Error::not_found(format!("hole {hole_id}")))?;
            (hole, previous)
        };
        drop(pin);
        hooks::purge_later(
            self.pool.clone(),
            self.store.clone(),
            previous.into_iter().filter(|p| p.key != attachment.key).collect(),
        );

        self.enqueue(StylizeJob::for_layout(hole_id)).await?;
        Ok(hole)
    }

    async fn enqueue(&self, job: StylizeJob) -> Result<()> {
        self.queue
            .submit(job)
            .await
            .map_err(|e| Error::internal(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Votes, redo, delete
    // ------------------------------------------------------------------

    pub fn vote(
        &self,
        hole_id: HoleId,
        image_id: HoleImageId,
        user_id: UserId,
        value: VoteValue,
    ) -> Result<VoteResult> {
        let conn = self.conn()?;
        find_in_hole(&conn, hole_id, image_id)?;
        let (upvotes_count, downvotes_count) = votes::cast_vote(&conn, image_id, user_id, value)?;
        let total = upvotes_count + downvotes_count;
        let score = if total == 0 {
            fairway_db::models::DEFAULT_SCORE
        } else {
            upvotes_count as f64 / total as f64
        };
        Ok(VoteResult {
            image_id,
            value,
            upvotes_count,
            downvotes_count,
            score,
        })
    }

    /// Run stylization again for one of the caller's uploads.
    ///
    /// Redoing a stylized image restyles its original.
    pub async fn redo(
        &self,
        hole_id: HoleId,
        image_id: HoleImageId,
        user_id: UserId,
    ) -> Result<HoleImage> {
        let image = {
            let conn = self.conn()?;
            let image = find_in_hole(&conn, hole_id, image_id)?;
            if image.user_id != user_id {
                return Err(Error::forbidden(REDO_FORBIDDEN_MESSAGE));
            }
            let original = match image.source_image_id {
                Some(source_id) => find_in_hole(&conn, hole_id, source_id)?,
                None => image,
            };
            if original.is_video() {
                return Err(Error::invalid_input(NOT_AN_IMAGE_MESSAGE));
            }
            hooks::set_status(&conn, &self.events, original.id, ImageStatus::Processing, None)?
        };

        info!(%hole_id, image_id = %image.id, "Stylization redo requested");
        self.enqueue(StylizeJob::for_upload(hole_id, image.id)).await?;
        Ok(image)
    }

    /// Delete one of the caller's uploads with its renditions and votes.
    pub fn delete(&self, hole_id: HoleId, image_id: HoleImageId, user_id: UserId) -> Result<()> {
        let orphaned = {
            let conn = self.conn()?;
            let image = find_in_hole(&conn, hole_id, image_id)?;
            if image.user_id != user_id {
                return Err(Error::forbidden(DELETE_FORBIDDEN_MESSAGE));
            }
            hole_images::delete_hole_image(&conn, image_id)?
        };

        info!(%hole_id, %image_id, blobs = orphaned.len(), "Deleted hole image");
        hooks::purge_later(self.pool.clone(), self.store.clone(), orphaned);
        Ok(())
    }
}

fn ensure_hole(conn: &rusqlite::Connection, hole_id: HoleId) -> Result<()> {
    match holes::get_hole(conn, hole_id)? {
        Some(_) => Ok(()),
        None => Err(Error::not_found(format!("hole {hole_id}"))),
    }
}

fn find_in_hole(
    conn: &rusqlite::Connection,
    hole_id: HoleId,
    image_id: HoleImageId,
) -> Result<HoleImage> {
    hole_images::get_hole_image_in_hole(conn, hole_id, image_id)?.ok_or_else(|| {
        debug!(%hole_id, %image_id, "Hole image not found in hole");
        Error::not_found(format!("hole image {image_id}"))
    })
}
