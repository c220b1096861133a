//! Writes that notify live viewers once they commit.
//!
//! Every hole image creation publishes `tile_created`; every status update
//! publishes `tile_replaced`, plus `flash_cleared` when the image just became
//! ready. Hole-level stylization changes publish `stylization_status`.

use fairway_common::{HoleId, HoleImageId, ImageStatus, Result, StylizationStatus};
use fairway_db::models::{Attachment, HoleImage, NewHoleImage};
use fairway_db::pool::{get_conn, DbPool};
use fairway_db::queries::{hole_images, holes};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::storage::AttachmentStore;
use crate::state::EventBus;

pub(crate) fn create_image(
    conn: &Connection,
    events: &EventBus,
    new: &NewHoleImage,
) -> Result<HoleImage> {
    let image = hole_images::insert_hole_image(conn, new)?;
    events.tile_created(&image);
    Ok(image)
}

pub(crate) fn set_status(
    conn: &Connection,
    events: &EventBus,
    id: HoleImageId,
    status: ImageStatus,
    error: Option<&str>,
) -> Result<HoleImage> {
    let change = hole_images::update_status(conn, id, status, error)?;
    events.tile_replaced(&change.image);
    if change.became_ready() {
        events.flash_cleared(change.image.hole_id);
    }
    Ok(change.image)
}

pub(crate) fn set_hole_status(
    conn: &Connection,
    events: &EventBus,
    hole_id: HoleId,
    status: StylizationStatus,
    error: Option<&str>,
) -> Result<()> {
    holes::update_stylization_status(conn, hole_id, status, error)?;
    events.stylization_status(hole_id, status, error);
    Ok(())
}

/// Delete blobs no row references any more, off the request path.
pub(crate) fn purge_later(pool: DbPool, store: AttachmentStore, attachments: Vec<Attachment>) {
    if attachments.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for attachment in attachments {
            if let Err(e) = purge_one(&pool, &store, &attachment.key) {
                warn!(key = %attachment.key, error = %e, "Failed to purge attachment");
            }
        }
    });
}

fn purge_one(pool: &DbPool, store: &AttachmentStore, key: &str) -> anyhow::Result<()> {
    let purged = store.purge(key, || {
        let conn = get_conn(pool)?;
        Ok(hole_images::attachment_in_use(&conn, key)?)
    })?;
    if purged {
        debug!(%key, "Purged attachment");
    } else {
        debug!(%key, "Attachment still referenced, keeping blob");
    }
    Ok(())
}
