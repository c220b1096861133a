//! Hole image database queries.
//!
//! This module provides the lifecycle operations for hole images: creation
//! of uploads and derived images, attaching blobs, status transitions,
//! display listings, and deletion with cascade.

use rusqlite::{Connection, OptionalExtension};
use fairway_common::{Error, HoleId, HoleImageId, ImageKind, ImageStatus, Result};

use super::holes::parse_attachment;
use super::{now_timestamp, parse_column, parse_optional_column, parse_timestamp};
use crate::models::{Attachment, HoleImage, NewHoleImage};

const IMAGE_COLUMNS: &str = "id, hole_id, user_id, kind, status, upvotes_count,
    downvotes_count, source_image_id, error_message, attachment_key, content_type,
    byte_size, filename, created_at, updated_at";

/// Newest first; rowid breaks ties between rows written in the same microsecond.
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

/// Parse a hole image from a database row.
///
/// Expects columns in the order of `IMAGE_COLUMNS`.
fn parse_hole_image_row(row: &rusqlite::Row) -> rusqlite::Result<HoleImage> {
    Ok(HoleImage {
        id: parse_column(row, 0)?,
        hole_id: parse_column(row, 1)?,
        user_id: parse_column(row, 2)?,
        kind: parse_column(row, 3)?,
        status: parse_column(row, 4)?,
        upvotes_count: row.get(5)?,
        downvotes_count: row.get(6)?,
        source_image_id: parse_optional_column(row, 7)?,
        error_message: row.get(8)?,
        attachment: parse_attachment(row, 9)?,
        created_at: parse_timestamp(row, 13)?,
        updated_at: parse_timestamp(row, 14)?,
    })
}

fn query_images(
    conn: &Connection,
    sql: &str,
    params: &[(&str, &dyn rusqlite::ToSql)],
) -> Result<Vec<HoleImage>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;

    let images = stmt
        .query_map(params, parse_hole_image_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(images)
}

/// Result of a status update: the row after the write and the status before it.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub image: HoleImage,
    pub previous: ImageStatus,
}

impl StatusChange {
    /// True when this update moved the image into `ready`.
    pub fn became_ready(&self) -> bool {
        self.image.status == ImageStatus::Ready && self.previous != ImageStatus::Ready
    }
}

/// Insert a new hole image.
///
/// A stylized image must reference an existing original on the same hole.
///
/// # Returns
///
/// * `Ok(HoleImage)` - The inserted row
/// * `Err(Error::InvalidInput)` - If a stylized image has no valid source
/// * `Err(Error)` - If a database error occurs
pub fn insert_hole_image(conn: &Connection, new: &NewHoleImage) -> Result<HoleImage> {
    if new.kind == ImageKind::Stylized {
        let source_id = new
            .source_image_id
            .ok_or_else(|| Error::invalid_input("stylized image requires a source image"))?;
        let source = get_hole_image(conn, source_id)?
            .ok_or_else(|| Error::invalid_input(format!("source image {source_id} not found")))?;
        if source.kind != ImageKind::Original || source.hole_id != new.hole_id {
            return Err(Error::invalid_input(
                "source image must be an original on the same hole",
            ));
        }
    }

    let id = HoleImageId::new();
    let now = now_timestamp();
    let attachment = new.attachment.as_ref();

    conn.execute(
        "INSERT INTO hole_images (id, hole_id, user_id, kind, status, source_image_id,
             attachment_key, content_type, byte_size, filename, created_at, updated_at)
         VALUES (:id, :hole_id, :user_id, :kind, :status, :source_image_id,
             :key, :content_type, :byte_size, :filename, :now, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":hole_id": new.hole_id.to_string(),
            ":user_id": new.user_id.to_string(),
            ":kind": new.kind.to_string(),
            ":status": new.status.to_string(),
            ":source_image_id": new.source_image_id.map(|s| s.to_string()),
            ":key": attachment.map(|a| a.key.as_str()),
            ":content_type": attachment.map(|a| a.content_type.as_str()),
            ":byte_size": attachment.map(|a| a.byte_size),
            ":filename": attachment.map(|a| a.filename.as_str()),
            ":now": &now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_hole_image(conn, id)?.ok_or_else(|| Error::internal("hole image vanished after insert"))
}

/// Get a hole image by ID.
pub fn get_hole_image(conn: &Connection, id: HoleImageId) -> Result<Option<HoleImage>> {
    conn.query_row(
        &format!("SELECT {IMAGE_COLUMNS} FROM hole_images WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        parse_hole_image_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Get a hole image only if it belongs to the given hole.
pub fn get_hole_image_in_hole(
    conn: &Connection,
    hole_id: HoleId,
    id: HoleImageId,
) -> Result<Option<HoleImage>> {
    conn.query_row(
        &format!("SELECT {IMAGE_COLUMNS} FROM hole_images WHERE id = :id AND hole_id = :hole_id"),
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":hole_id": hole_id.to_string(),
        },
        parse_hole_image_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Store the attachment reference on an image without changing its status.
pub fn attach(conn: &Connection, id: HoleImageId, attachment: &Attachment) -> Result<HoleImage> {
    let rows = conn
        .execute(
            "UPDATE hole_images SET attachment_key = :key, content_type = :content_type,
                 byte_size = :byte_size, filename = :filename, updated_at = :now
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

    if rows == 0 {
        return Err(Error::not_found(format!("hole image {id}")));
    }

    get_hole_image(conn, id)?.ok_or_else(|| Error::not_found(format!("hole image {id}")))
}

/// Set an image's status and error message.
///
/// `error` replaces the stored message, so passing `None` clears it.
pub fn update_status(
    conn: &Connection,
    id: HoleImageId,
    status: ImageStatus,
    error: Option<&str>,
) -> Result<StatusChange> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let previous = get_hole_image(&tx, id)?
        .ok_or_else(|| Error::not_found(format!("hole image {id}")))?
        .status;

    tx.execute(
        "UPDATE hole_images SET status = :status, error_message = :error, updated_at = :now
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":status": status.to_string(),
            ":error": error,
            ":now": now_timestamp(),
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let image = get_hole_image(&tx, id)?
        .ok_or_else(|| Error::not_found(format!("hole image {id}")))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(StatusChange { image, previous })
}

/// All images of a hole, newest first.
pub fn list_for_hole(conn: &Connection, hole_id: HoleId) -> Result<Vec<HoleImage>> {
    let hole_id = hole_id.to_string();
    query_images(
        conn,
        &format!("SELECT {IMAGE_COLUMNS} FROM hole_images WHERE hole_id = :hole_id {NEWEST_FIRST}"),
        &[(":hole_id", &hole_id)],
    )
}

/// Ready images (`image/*` only, videos excluded) of a hole, newest first.
pub fn list_ready_images(conn: &Connection, hole_id: HoleId) -> Result<Vec<HoleImage>> {
    let hole_id = hole_id.to_string();
    query_images(
        conn,
        &format!(
            "SELECT {IMAGE_COLUMNS} FROM hole_images
             WHERE hole_id = :hole_id AND status = 'ready'
               AND LOWER(content_type) LIKE 'image/%'
             {NEWEST_FIRST}"
        ),
        &[(":hole_id", &hole_id)],
    )
}

/// Images derived from an original, newest first.
pub fn list_derived(conn: &Connection, source_id: HoleImageId) -> Result<Vec<HoleImage>> {
    let source_id = source_id.to_string();
    query_images(
        conn,
        &format!(
            "SELECT {IMAGE_COLUMNS} FROM hole_images
             WHERE source_image_id = :source_id {NEWEST_FIRST}"
        ),
        &[(":source_id", &source_id)],
    )
}

/// Image-typed originals left `pending` or `processing`, oldest first.
pub fn list_unfinished_originals(conn: &Connection) -> Result<Vec<HoleImage>> {
    query_images(
        conn,
        &format!(
            "SELECT {IMAGE_COLUMNS} FROM hole_images
             WHERE kind = 'original' AND status IN ('pending', 'processing')
               AND LOWER(content_type) LIKE 'image/%'
             ORDER BY created_at, rowid"
        ),
        &[],
    )
}

/// Delete an image together with its derived images and votes.
///
/// # Returns
///
/// * `Ok(Vec<Attachment>)` - Attachments that are no longer referenced
/// * `Err(Error::NotFound)` - If the image does not exist
/// * `Err(Error)` - If a database error occurs
pub fn delete_hole_image(conn: &Connection, id: HoleImageId) -> Result<Vec<Attachment>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let image = get_hole_image(&tx, id)?
        .ok_or_else(|| Error::not_found(format!("hole image {id}")))?;

    let mut orphaned: Vec<Attachment> = list_derived(&tx, id)?
        .into_iter()
        .filter_map(|derived| derived.attachment)
        .collect();
    orphaned.extend(image.attachment);

    tx.execute(
        "DELETE FROM hole_images WHERE id = :id",
        rusqlite::named_params! { ":id": id.to_string() },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(orphaned)
}

/// Whether any hole image or hole layout still references a blob key.
///
/// Blobs are content-addressed, so two rows may share one.
pub fn attachment_in_use(conn: &Connection, key: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM hole_images WHERE attachment_key = :key)
             OR EXISTS (
                 SELECT 1 FROM holes WHERE layout_key = :key OR stylized_layout_key = :key
             )",
        rusqlite::named_params! { ":key": key },
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
