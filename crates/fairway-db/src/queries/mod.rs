//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - courses: Course creation (with its holes) and lookup
//! - holes: Hole lookup, legacy layout attachments, stylization status
//! - hole_images: Hole image lifecycle and display candidates
//! - votes: Vote upsert and recount

pub mod courses;
pub mod hole_images;
pub mod holes;
pub mod votes;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use std::str::FromStr;

/// Current time formatted the way every `created_at`/`updated_at` column stores it.
///
/// Microsecond precision keeps `ORDER BY created_at` meaningful for rows
/// written within the same second.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a column holding a value with a `FromStr` impl (ids and enums).
pub(crate) fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

/// Parse a nullable column holding a value with a `FromStr` impl.
pub(crate) fn parse_optional_column<T>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => raw.parse().map(Some).map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}
