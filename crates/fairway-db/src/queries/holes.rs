//! Hole database queries.
//!
//! Holes are created together with their course (see `courses::create_course`);
//! this module covers lookup, hole details, the legacy layout attachments,
//! and the hole-level stylization status.

use rusqlite::{Connection, OptionalExtension};
use fairway_common::{CourseId, Error, HoleId, Result, StylizationStatus};

use super::{now_timestamp, parse_column, parse_optional_column, parse_timestamp};
use crate::models::{Attachment, Hole};

const HOLE_COLUMNS: &str = "id, course_id, number, par, yardage,
    layout_key, layout_content_type, layout_byte_size, layout_filename,
    stylized_layout_key, stylized_layout_content_type, stylized_layout_byte_size,
    stylized_layout_filename, stylization_status, stylization_error,
    created_at, updated_at";

/// Read an attachment stored as four columns starting at `start`.
pub(crate) fn parse_attachment(
    row: &rusqlite::Row,
    start: usize,
) -> rusqlite::Result<Option<Attachment>> {
    let Some(key) = row.get::<_, Option<String>>(start)? else {
        return Ok(None);
    };

    Ok(Some(Attachment {
        key,
        content_type: row
            .get::<_, Option<String>>(start + 1)?
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        byte_size: row.get::<_, Option<i64>>(start + 2)?.unwrap_or(0),
        filename: row.get::<_, Option<String>>(start + 3)?.unwrap_or_default(),
    }))
}

fn parse_hole_row(row: &rusqlite::Row) -> rusqlite::Result<Hole> {
    Ok(Hole {
        id: parse_column(row, 0)?,
        course_id: parse_column(row, 1)?,
        number: row.get(2)?,
        par: row.get(3)?,
        yardage: row.get(4)?,
        layout: parse_attachment(row, 5)?,
        stylized_layout: parse_attachment(row, 9)?,
        stylization_status: parse_optional_column(row, 13)?,
        stylization_error: row.get(14)?,
        created_at: parse_timestamp(row, 15)?,
        updated_at: parse_timestamp(row, 16)?,
    })
}

fn ensure_updated(rows: usize, id: HoleId) -> Result<()> {
    if rows == 0 {
        Err(Error::not_found(format!("hole {id}")))
    } else {
        Ok(())
    }
}

/// Get a hole by ID.
///
/// # Returns
///
/// * `Ok(Some(Hole))` - The hole if found
/// * `Ok(None)` - If the hole does not exist
/// * `Err(Error)` - If a database error occurs
pub fn get_hole(conn: &Connection, id: HoleId) -> Result<Option<Hole>> {
    conn.query_row(
        &format!("SELECT {HOLE_COLUMNS} FROM holes WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        parse_hole_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get a hole by its number within a course.
pub fn get_hole_by_number(
    conn: &Connection,
    course_id: CourseId,
    number: i64,
) -> Result<Option<Hole>> {
    conn.query_row(
        &format!(
            "SELECT {HOLE_COLUMNS} FROM holes
             WHERE course_id = :course_id AND number = :number"
        ),
        rusqlite::named_params! {
            ":course_id": course_id.to_string(),
            ":number": number,
        },
        parse_hole_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List a course's holes in playing order.
pub fn list_holes(conn: &Connection, course_id: CourseId) -> Result<Vec<Hole>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {HOLE_COLUMNS} FROM holes WHERE course_id = :course_id ORDER BY number"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let holes = stmt
        .query_map(
            rusqlite::named_params! { ":course_id": course_id.to_string() },
            parse_hole_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(holes)
}

/// Validate par (3 to 5) and yardage (51 to 799).
pub fn validate_details(par: Option<i64>, yardage: Option<i64>) -> Result<()> {
    if let Some(par) = par {
        if !(3..=5).contains(&par) {
            return Err(Error::invalid_input("Par must be between 3 and 5"));
        }
    }
    if let Some(yardage) = yardage {
        if yardage <= 50 || yardage >= 800 {
            return Err(Error::invalid_input(
                "Yardage must be greater than 50 and less than 800",
            ));
        }
    }
    Ok(())
}

/// Set a hole's par and yardage. `None` clears the value.
pub fn update_details(
    conn: &Connection,
    id: HoleId,
    par: Option<i64>,
    yardage: Option<i64>,
) -> Result<()> {
    validate_details(par, yardage)?;

    let rows = conn
        .execute(
            "UPDATE holes SET par = :par, yardage = :yardage, updated_at = :now WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":par": par,
                ":yardage": yardage,
                ":now": now_timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    ensure_updated(rows, id)
}

/// Attach a legacy layout, replacing any previous one.
///
/// Returns the attachment it replaced so the caller can purge the blob.
pub fn set_layout(
    conn: &Connection,
    id: HoleId,
    attachment: &Attachment,
) -> Result<Option<Attachment>> {
    let previous = get_hole(conn, id)?
        .ok_or_else(|| Error::not_found(format!("hole {id}")))?
        .layout;

    conn.execute(
        "UPDATE holes SET layout_key = :key, layout_content_type = :content_type,
             layout_byte_size = :byte_size, layout_filename = :filename, updated_at = :now
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":key": &attachment.key,
            ":content_type": &attachment.content_type,
            ":byte_size": attachment.byte_size,
            ":filename": &attachment.filename,
            ":now": now_timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(previous)
}

/// Attach the stylized rendition of the legacy layout.
///
/// Returns the attachment it replaced so the caller can purge the blob.
pub fn set_stylized_layout(
    conn: &Connection,
    id: HoleId,
    attachment: &Attachment,
) -> Result<Option<Attachment>> {
    let previous = get_hole(conn, id)?
        .ok_or_else(|| Error::not_found(format!("hole {id}")))?
        .stylized_layout;

    conn.execute(
        "UPDATE holes SET stylized_layout_key = :key,
             stylized_layout_content_type = :content_type,
             stylized_layout_byte_size = :byte_size,
             stylized_layout_filename = :filename, updated_at = :now
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":key": &attachment.key,
            ":content_type": &attachment.content_type,
            ":byte_size": attachment.byte_size,
            ":filename": &attachment.filename,
            ":now": now_timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(previous)
}

/// Record the hole-level stylization status and error message.
pub fn update_stylization_status(
    conn: &Connection,
    id: HoleId,
    status: StylizationStatus,
    error: Option<&str>,
) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE holes SET stylization_status = :status, stylization_error = :error,
                 updated_at = :now
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": id.to_string(),
                ":status": status.to_string(),
                ":error": error,
                ":now": now_timestamp(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    ensure_updated(rows, id)
}
