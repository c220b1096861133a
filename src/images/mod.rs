//! Hole image storage, selection, and lifecycle.
//!
//! Blobs live in a content-addressed [`AttachmentStore`]; rows live in
//! `fairway_db`. [`HoleImageService`] coordinates the two and publishes
//! live updates after each write.

pub(crate) mod hooks;
pub mod selection;
pub mod service;
pub mod storage;

pub use selection::{display_candidates, pick_weighted};
pub use service::{HoleImageService, UploadedFile, VoteResult};
pub use storage::{AttachmentStore, BlobPin};
