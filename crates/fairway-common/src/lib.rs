//! Fairway-Common: shared types, identifiers, and errors.
//!
//! This crate provides common functionality used across fairway:
//!
//! - **Typed IDs**: UUID wrappers for users, courses, holes, images, and votes
//! - **Core Types**: image kind/status, hole stylization status, vote values
//! - **Error Handling**: the common error type and result alias
//!
//! # Examples
//!
//! ```
//! use fairway_common::{Error, HoleId, ImageStatus, MediaClass, Result};
//!
//! let _hole_id = HoleId::new();
//! assert_eq!(MediaClass::from_content_type("image/jpeg"), MediaClass::Image);
//!
//! fn example(status: ImageStatus) -> Result<()> {
//!     if status == ImageStatus::Ready {
//!         return Ok(());
//!     }
//!     Err(Error::invalid_input("still processing"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;

/// Upload size ceiling shared by the crop client and the server, in bytes.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
