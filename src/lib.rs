//! Fairway - hole imagery for golf courses
//!
//! This library crate exposes the service layers for integration testing:
//! uploads and their storage, AI stylization, weighted display selection,
//! and the HTTP/SSE surface.

pub mod config;
pub mod generation;
pub mod images;
pub mod server;
pub mod state;
pub mod stylize;
