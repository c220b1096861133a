//! Fairway-DB: database schema, migrations, and query operations
//!
//! This crate provides persistence for courses, holes, hole images, and
//! votes using SQLite with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use fairway_db::pool::{init_pool, get_conn};
//! use fairway_db::queries::courses::{self, NewCourse};
//!
//! let pool = init_pool("/var/lib/fairway/fairway.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let course = courses::create_course(
//!     &conn,
//!     &NewCourse::new("Pebble Beach", "California"),
//!     18,
//! )
//! .unwrap();
//! println!("Created course: {}", course.name);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
