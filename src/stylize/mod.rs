//! Background stylization of hole uploads.

pub mod job;
pub mod queue;

pub use job::{StylizeJob, StylizeOutcome, Stylizer, NO_IMAGE_MESSAGE};
pub use queue::StylizeQueue;
