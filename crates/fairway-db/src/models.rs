//! Rust models matching the database schema.
//!
//! Ids and enums come from `fairway-common`; timestamps are stored as
//! RFC 3339 strings and surfaced as `DateTime<Utc>`.

use chrono::{DateTime, Utc};
use fairway_common::{
    CourseId, HoleId, HoleImageId, ImageKind, ImageStatus, MediaClass, StylizationStatus,
    UserId, VoteId, VoteValue,
};
use serde::{Deserialize, Serialize};

/// Score of an image nobody has voted on.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Golf course model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    /// Seed passed to the generator so a course's holes share one look.
    pub style_seed: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference to a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Storage key understood by the attachment store.
    pub key: String,
    pub content_type: String,
    pub byte_size: i64,
    pub filename: String,
}

impl Attachment {
    pub fn media_class(&self) -> MediaClass {
        MediaClass::from_content_type(&self.content_type)
    }

    /// Filename without its final extension.
    pub fn stem(&self) -> &str {
        match self.filename.rfind('.') {
            Some(idx) if idx > 0 => &self.filename[..idx],
            _ => &self.filename,
        }
    }
}

/// A hole on a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hole {
    pub id: HoleId,
    pub course_id: CourseId,
    pub number: i64,
    pub par: Option<i64>,
    pub yardage: Option<i64>,
    /// Legacy single-layout attachment.
    pub layout: Option<Attachment>,
    pub stylized_layout: Option<Attachment>,
    pub stylization_status: Option<StylizationStatus>,
    pub stylization_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An uploaded or derived image (or video) attached to a hole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoleImage {
    pub id: HoleImageId,
    pub hole_id: HoleId,
    pub user_id: UserId,
    pub kind: ImageKind,
    pub status: ImageStatus,
    pub upvotes_count: i64,
    pub downvotes_count: i64,
    pub source_image_id: Option<HoleImageId>,
    pub error_message: Option<String>,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HoleImage {
    /// Share of upvotes, or 0.5 when nobody has voted.
    pub fn score(&self) -> f64 {
        let total = self.upvotes_count + self.downvotes_count;
        if total <= 0 {
            DEFAULT_SCORE
        } else {
            self.upvotes_count as f64 / total as f64
        }
    }

    /// True when the attachment's content type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|a| a.media_class() == MediaClass::Image)
    }

    pub fn is_video(&self) -> bool {
        self.attachment
            .as_ref()
            .is_some_and(|a| a.media_class() == MediaClass::Video)
    }

    pub fn is_stylized(&self) -> bool {
        self.kind == ImageKind::Stylized
    }
}

/// Fields supplied when a hole image row is created.
#[derive(Debug, Clone)]
pub struct NewHoleImage {
    pub hole_id: HoleId,
    pub user_id: UserId,
    pub kind: ImageKind,
    pub status: ImageStatus,
    pub source_image_id: Option<HoleImageId>,
    pub attachment: Option<Attachment>,
}

impl NewHoleImage {
    /// A user upload awaiting its attachment.
    pub fn upload(hole_id: HoleId, user_id: UserId) -> Self {
        Self {
            hole_id,
            user_id,
            kind: ImageKind::Original,
            status: ImageStatus::Processing,
            source_image_id: None,
            attachment: None,
        }
    }

    /// A ready stylized image derived from `source`.
    pub fn derived(source: &HoleImage, attachment: Attachment) -> Self {
        Self {
            hole_id: source.hole_id,
            user_id: source.user_id,
            kind: ImageKind::Stylized,
            status: ImageStatus::Ready,
            source_image_id: Some(source.id),
            attachment: Some(attachment),
        }
    }
}

/// One user's vote on a hole image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoleImageVote {
    pub id: VoteId,
    pub hole_image_id: HoleImageId,
    pub user_id: UserId,
    pub value: VoteValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
