//! Core type definitions for hole images, votes, and stylization state.
//!
//! All enums serialize in lowercase and round-trip through their `Display`
//! and `FromStr` forms, which are also the values stored in the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Whether a hole image is a user upload or derived from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Uploaded by a user.
    Original,
    /// Produced by the stylization pipeline from an original.
    Stylized,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Stylized => write!(f, "stylized"),
        }
    }
}

impl FromStr for ImageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "stylized" => Ok(Self::Stylized),
            other => Err(Error::invalid_input(format!("unknown image kind: {other}"))),
        }
    }
}

/// Lifecycle status of a hole image.
///
/// `Pending → Processing → {Ready, Failed}`; `Ready` implies the attachment
/// is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ImageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(Error::invalid_input(format!("unknown image status: {other}"))),
        }
    }
}

/// Coarse per-hole stylization state for the legacy single-layout path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylizationStatus {
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for StylizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for StylizationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(Error::invalid_input(format!(
                "unknown stylization status: {other}"
            ))),
        }
    }
}

/// Direction of a vote on a hole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    /// Lenient mapping used by the vote endpoint: `-1` is a downvote,
    /// anything else an upvote.
    pub fn from_lenient(value: i64) -> Self {
        if value == -1 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(Error::invalid_input(format!(
                "vote value must be 1 or -1, got {other}"
            ))),
        }
    }
}

/// Broad class of an uploaded file, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Image,
    Video,
    Other,
}

impl MediaClass {
    /// Classify a MIME type such as `image/png` or `video/mp4`.
    pub fn from_content_type(content_type: &str) -> Self {
        let lower = content_type.trim().to_ascii_lowercase();
        if lower.starts_with("image/") {
            Self::Image
        } else if lower.starts_with("video/") {
            Self::Video
        } else {
            Self::Other
        }
    }
}
