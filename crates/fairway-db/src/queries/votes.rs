//! Vote database queries.
//!
//! Every vote write recounts the image's vote totals from the vote rows in
//! the same transaction, so the cached counts always match the live rows.

use rusqlite::{Connection, OptionalExtension};
use fairway_common::{Error, HoleImageId, Result, UserId, VoteId, VoteValue};

use super::now_timestamp;

/// Recount the cached vote totals of one image.
fn recount(conn: &Connection, image_id: HoleImageId) -> Result<()> {
    conn.execute(
        "UPDATE hole_images SET
             upvotes_count = (SELECT COUNT(*) FROM hole_image_votes
                              WHERE hole_image_id = :id AND value = 1),
             downvotes_count = (SELECT COUNT(*) FROM hole_image_votes
                                WHERE hole_image_id = :id AND value = -1)
         WHERE id = :id",
        rusqlite::named_params! { ":id": image_id.to_string() },
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Record a user's vote on an image.
///
/// A repeat vote from the same user updates the existing row. The image's
/// vote totals are recounted before the transaction commits.
///
/// # Returns
///
/// * `Ok((up, down))` - The recounted totals
/// * `Err(Error::NotFound)` - If the image does not exist
/// * `Err(Error)` - If a database error occurs
pub fn cast_vote(
    conn: &Connection,
    image_id: HoleImageId,
    user_id: UserId,
    value: VoteValue,
) -> Result<(i64, i64)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let exists: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM hole_images WHERE id = :id",
            rusqlite::named_params! { ":id": image_id.to_string() },
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;
    if exists.is_none() {
        return Err(Error::not_found(format!("hole image {image_id}")));
    }

    let now = now_timestamp();
    tx.execute(
        "INSERT INTO hole_image_votes (id, hole_image_id, user_id, value, created_at, updated_at)
         VALUES (:id, :image_id, :user_id, :value, :now, :now)
         ON CONFLICT (hole_image_id, user_id)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::named_params! {
            ":id": VoteId::new().to_string(),
            ":image_id": image_id.to_string(),
            ":user_id": user_id.to_string(),
            ":value": i64::from(value),
            ":now": &now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    recount(&tx, image_id)?;

    let totals = tx
        .query_row(
            "SELECT upvotes_count, downvotes_count FROM hole_images WHERE id = :id",
            rusqlite::named_params! { ":id": image_id.to_string() },
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, HoleImage, HoleImageVote, NewHoleImage};
    use crate::pool::init_memory_pool;
    use crate::queries::courses::{create_course, NewCourse};
    use crate::queries::hole_images::{get_hole_image, insert_hole_image};
    use crate::queries::holes::get_hole_by_number;
    use crate::queries::{parse_column, parse_timestamp};
    use fairway_common::{ImageKind, ImageStatus};

    fn parse_vote_row(row: &rusqlite::Row) -> rusqlite::Result<HoleImageVote> {
        let raw: i64 = row.get(3)?;
        let value = VoteValue::try_from(raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
        })?;

        Ok(HoleImageVote {
            id: parse_column(row, 0)?,
            hole_image_id: parse_column(row, 1)?,
            user_id: parse_column(row, 2)?,
            value,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
        })
    }

    fn get_vote(conn: &Connection, image_id: HoleImageId, user_id: UserId) -> Option<HoleImageVote> {
        conn.query_row(
            "SELECT id, hole_image_id, user_id, value, created_at, updated_at
             FROM hole_image_votes WHERE hole_image_id = :image_id AND user_id = :user_id",
            rusqlite::named_params! {
                ":image_id": image_id.to_string(),
                ":user_id": user_id.to_string(),
            },
            parse_vote_row,
        )
        .optional()
        .unwrap()
    }

    fn create_test_image(conn: &Connection) -> HoleImage {
        let course = create_course(conn, &NewCourse::new("Votes", "Course"), 9).unwrap();
        let hole = get_hole_by_number(conn, course.id, 3).unwrap().unwrap();
        insert_hole_image(
            conn,
            &NewHoleImage {
                hole_id: hole.id,
                user_id: UserId::new(),
                kind: ImageKind::Original,
                status: ImageStatus::Ready,
                source_image_id: None,
                attachment: Some(Attachment {
                    key: "cd/cdef".to_string(),
                    content_type: "image/png".to_string(),
                    byte_size: 12,
                    filename: "hole.png".to_string(),
                }),
            },
        )
        .unwrap()
    }

    /// Count an image's vote rows by sign, straight from the vote table.
    fn count_votes(conn: &Connection, image_id: HoleImageId) -> (i64, i64) {
        conn.query_row(
            "SELECT COALESCE(SUM(value = 1), 0), COALESCE(SUM(value = -1), 0)
             FROM hole_image_votes WHERE hole_image_id = :image_id",
            rusqlite::named_params! { ":image_id": image_id.to_string() },
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    }

    fn assert_counts_match(conn: &Connection, image_id: HoleImageId) {
        let image = get_hole_image(conn, image_id).unwrap().unwrap();
        let (up, down) = count_votes(conn, image_id);
        assert_eq!(image.upvotes_count, up);
        assert_eq!(image.downvotes_count, down);
    }

    #[test]
    fn test_cast_vote_counts() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let image = create_test_image(&conn);

        assert_eq!(cast_vote(&conn, image.id, UserId::new(), VoteValue::Up).unwrap(), (1, 0));
        assert_eq!(cast_vote(&conn, image.id, UserId::new(), VoteValue::Up).unwrap(), (2, 0));
        assert_eq!(cast_vote(&conn, image.id, UserId::new(), VoteValue::Down).unwrap(), (2, 1));
        assert_counts_match(&conn, image.id);
    }

    #[test]
    fn test_changed_vote_updates_row() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let image = create_test_image(&conn);
        let voter = UserId::new();

        cast_vote(&conn, image.id, voter, VoteValue::Up).unwrap();
        let first = get_vote(&conn, image.id, voter).unwrap();

        assert_eq!(cast_vote(&conn, image.id, voter, VoteValue::Down).unwrap(), (0, 1));
        let second = get_vote(&conn, image.id, voter).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.value, VoteValue::Down);

        // Repeating the same vote is idempotent.
        assert_eq!(cast_vote(&conn, image.id, voter, VoteValue::Down).unwrap(), (0, 1));
        assert_counts_match(&conn, image.id);
    }

    #[test]
    fn test_counts_track_arbitrary_sequence() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let image = create_test_image(&conn);
        let voters: Vec<UserId> = (0..5).map(|_| UserId::new()).collect();

        let sequence = [
            (0, VoteValue::Up),
            (1, VoteValue::Down),
            (2, VoteValue::Up),
            (0, VoteValue::Down),
            (3, VoteValue::Down),
            (1, VoteValue::Up),
            (4, VoteValue::Up),
            (2, VoteValue::Up),
        ];
        for (voter, value) in sequence {
            cast_vote(&conn, image.id, voters[voter], value).unwrap();
            assert_counts_match(&conn, image.id);
        }

        let image = get_hole_image(&conn, image.id).unwrap().unwrap();
        assert_eq!((image.upvotes_count, image.downvotes_count), (3, 2));
    }

    #[test]
    fn test_vote_on_missing_image() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let err = cast_vote(&conn, HoleImageId::new(), UserId::new(), VoteValue::Up).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
