//! Hole image API routes: upload, listing, display pick, votes, redo,
//! delete, and file serving.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use fairway_common::{Error, HoleId, HoleImageId, VoteValue};
use fairway_db::models::{Attachment, Hole, HoleImage};
use serde::Deserialize;

use super::error::ApiError;
use super::user::CurrentUser;
use super::AppContext;
use crate::images::service::{UploadedFile, VoteResult, MISSING_FILE_MESSAGE};

/// Recent uploads shown on a hole's media tab.
const RECENT_LIMIT: usize = 8;

pub fn image_routes() -> Router<AppContext> {
    Router::new()
        .route("/holes/:hole_id/images", get(list_display_images).post(upload_image))
        .route("/holes/:hole_id/images/display", get(display_image))
        .route("/holes/:hole_id/images/recent", get(recent_images))
        .route("/holes/:hole_id/images/:image_id", delete(delete_image))
        .route("/holes/:hole_id/images/:image_id/vote", post(vote_image))
        .route("/holes/:hole_id/images/:image_id/redo", post(redo_image))
        .route("/holes/:hole_id/layout", post(upload_layout))
        .route("/holes/:hole_id/layout/file", get(layout_file))
        .route("/holes/:hole_id/layout/stylized/file", get(stylized_layout_file))
        .route("/images/:image_id/file", get(image_file))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// `-1` downvotes; any other value upvotes.
    pub value: i64,
}

/// Read the `file` field of a multipart upload.
async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_input(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::invalid_input(e.to_string()))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(Error::invalid_input(MISSING_FILE_MESSAGE).into())
}

fn file_response((attachment, bytes): (Attachment, Vec<u8>)) -> Response {
    let disposition = format!(
        "inline; filename=\"{}\"",
        attachment.filename.replace('"', "")
    );
    (
        [
            (header::CONTENT_TYPE, attachment.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn upload_image(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
    CurrentUser(user_id): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<HoleImage>), ApiError> {
    let file = read_file_field(multipart).await?;
    let image = ctx.images.upload(hole_id, user_id, file).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn upload_layout(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
    CurrentUser(_): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Hole>), ApiError> {
    let file = read_file_field(multipart).await?;
    let hole = ctx.images.upload_layout(hole_id, file).await?;
    Ok((StatusCode::ACCEPTED, Json(hole)))
}

async fn list_display_images(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Json<Vec<HoleImage>>, ApiError> {
    Ok(Json(ctx.images.display_images(hole_id)?))
}

async fn display_image(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Json<HoleImage>, ApiError> {
    ctx.images
        .pick_display_image(hole_id, &mut rand::thread_rng())?
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("display image for hole {hole_id}")).into())
}

async fn recent_images(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Json<Vec<HoleImage>>, ApiError> {
    Ok(Json(ctx.images.recent_images(hole_id, RECENT_LIMIT)?))
}

async fn vote_image(
    State(ctx): State<AppContext>,
    Path((hole_id, image_id)): Path<(HoleId, HoleImageId)>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResult>, ApiError> {
    let value = VoteValue::from_lenient(req.value);
    Ok(Json(ctx.images.vote(hole_id, image_id, user_id, value)?))
}

async fn redo_image(
    State(ctx): State<AppContext>,
    Path((hole_id, image_id)): Path<(HoleId, HoleImageId)>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<HoleImage>), ApiError> {
    let image = ctx.images.redo(hole_id, image_id, user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(image)))
}

async fn delete_image(
    State(ctx): State<AppContext>,
    Path((hole_id, image_id)): Path<(HoleId, HoleImageId)>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, ApiError> {
    ctx.images.delete(hole_id, image_id, user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn image_file(
    State(ctx): State<AppContext>,
    Path(image_id): Path<HoleImageId>,
) -> Result<Response, ApiError> {
    Ok(file_response(ctx.images.image_file(image_id)?))
}

async fn layout_file(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Response, ApiError> {
    Ok(file_response(ctx.images.layout_file(hole_id, false)?))
}

async fn stylized_layout_file(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Response, ApiError> {
    Ok(file_response(ctx.images.layout_file(hole_id, true)?))
}
