//! Course and hole API routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use fairway_common::{CourseId, HoleId};
use fairway_db::models::{Course, Hole, HoleImage};
use fairway_db::queries::courses::NewCourse;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppContext;

pub fn course_routes() -> Router<AppContext> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:course_id", get(get_course))
        .route("/courses/:course_id/holes/:number", get(get_hole_page))
        .route("/holes/:hole_id", get(get_hole).patch(update_hole))
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 9 or 18; anything else creates 18 holes.
    #[serde(default)]
    pub num_holes: Option<i64>,
    #[serde(default)]
    pub style_seed: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHoleRequest {
    pub par: Option<i64>,
    pub yardage: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    #[serde(flatten)]
    pub course: Course,
    pub holes: Vec<Hole>,
}

/// A hole with the image chosen to represent it on this request.
#[derive(Debug, Serialize)]
pub struct HolePageResponse {
    #[serde(flatten)]
    pub hole: Hole,
    pub display_image: Option<HoleImage>,
    pub images_topic: String,
    pub flash_topic: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_courses(State(ctx): State<AppContext>) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(ctx.images.list_courses()?))
}

async fn create_course(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewCourse {
        name: req.name,
        location: req.location,
        description: req.description,
        style_seed: req.style_seed,
    };
    let course = ctx.images.create_course(&new, req.num_holes.unwrap_or(18))?;
    let (course, holes) = ctx.images.course_with_holes(course.id)?;
    Ok((StatusCode::CREATED, Json(CourseResponse { course, holes })))
}

async fn get_course(
    State(ctx): State<AppContext>,
    Path(course_id): Path<CourseId>,
) -> Result<Json<CourseResponse>, ApiError> {
    let (course, holes) = ctx.images.course_with_holes(course_id)?;
    Ok(Json(CourseResponse { course, holes }))
}

async fn get_hole_page(
    State(ctx): State<AppContext>,
    Path((course_id, number)): Path<(CourseId, i64)>,
) -> Result<Json<HolePageResponse>, ApiError> {
    let hole = ctx.images.hole_by_number(course_id, number)?;
    let display_image = ctx
        .images
        .pick_display_image(hole.id, &mut rand::thread_rng())?;
    Ok(Json(HolePageResponse {
        images_topic: crate::state::images_topic(hole.id),
        flash_topic: crate::state::flash_topic(hole.id),
        hole,
        display_image,
    }))
}

async fn get_hole(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
) -> Result<Json<Hole>, ApiError> {
    Ok(Json(ctx.images.hole(hole_id)?))
}

async fn update_hole(
    State(ctx): State<AppContext>,
    Path(hole_id): Path<HoleId>,
    Json(req): Json<UpdateHoleRequest>,
) -> Result<Json<Hole>, ApiError> {
    Ok(Json(ctx.images.update_hole_details(hole_id, req.par, req.yardage)?))
}
