//! What to do with a file the user just picked or dropped.

use fairway_common::{MediaClass, MAX_UPLOAD_BYTES};

/// Message shown when a picked file exceeds the upload limit.
pub const SIZE_LIMIT_MESSAGE: &str = "File must be 10MB or smaller.";

/// Outcome of [`classify_pick`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PickDecision {
    /// Open the cropper.
    Crop,
    /// Submit as-is; videos and unknown types are validated by the server.
    SubmitDirect,
    /// Refuse the file with a user-facing message.
    Rejected(String),
}

/// Classify a picked file by size and MIME type.
///
/// A size of zero means "unknown" and is never rejected.
pub fn classify_pick(size_bytes: u64, content_type: Option<&str>) -> PickDecision {
    if size_bytes > MAX_UPLOAD_BYTES {
        return PickDecision::Rejected(SIZE_LIMIT_MESSAGE.to_string());
    }

    match content_type.map(MediaClass::from_content_type) {
        Some(MediaClass::Image) => PickDecision::Crop,
        _ => PickDecision::SubmitDirect,
    }
}
