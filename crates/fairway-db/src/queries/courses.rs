//! Course database queries.
//!
//! Creating a course also creates its holes in the same transaction.

use rusqlite::{Connection, OptionalExtension};
use fairway_common::{CourseId, Error, HoleId, Result};

use super::{now_timestamp, parse_column, parse_timestamp};
use crate::models::Course;

/// Fields supplied when creating a course.
#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub style_seed: Option<i64>,
}

impl NewCourse {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_style_seed(mut self, seed: i64) -> Self {
        self.style_seed = Some(seed);
        self
    }
}

/// Hole count for a new course: 9 or 18, anything else becomes 18.
pub fn normalize_hole_count(requested: i64) -> i64 {
    if requested == 9 {
        9
    } else {
        18
    }
}

fn parse_course_row(row: &rusqlite::Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: parse_column(row, 0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        description: row.get(3)?,
        style_seed: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
    })
}

const COURSE_COLUMNS: &str =
    "id, name, location, description, style_seed, created_at, updated_at";

/// Create a course and its holes.
///
/// Name and location are trimmed and must be non-empty. The pair must be
/// unique ignoring case. `num_holes` is normalized with
/// [`normalize_hole_count`].
///
/// # Returns
///
/// * `Ok(Course)` - The created course
/// * `Err(Error::InvalidInput)` - If a field is blank or the course already exists
/// * `Err(Error)` - If a database error occurs
pub fn create_course(conn: &Connection, new: &NewCourse, num_holes: i64) -> Result<Course> {
    let name = new.name.trim();
    let location = new.location.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("Name can't be blank"));
    }
    if location.is_empty() {
        return Err(Error::invalid_input("Location can't be blank"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    if find_course_by_name_location(&tx, name, location)?.is_some() {
        return Err(Error::invalid_input(format!(
            "A course named {name} in {location} already exists"
        )));
    }

    let id = CourseId::new();
    let now = now_timestamp();
    let description = new
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    tx.execute(
        "INSERT INTO courses (id, name, location, description, style_seed, created_at, updated_at)
         VALUES (:id, :name, :location, :description, :style_seed, :now, :now)",
        rusqlite::named_params! {
            ":id": id.to_string(),
            ":name": name,
            ":location": location,
            ":description": description,
            ":style_seed": new.style_seed,
            ":now": &now,
        },
    )
    .map_err(|e| Error::database(e.to_string()))?;

    generate_holes(&tx, id, normalize_hole_count(num_holes))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    get_course(conn, id)?.ok_or_else(|| Error::internal("course vanished after insert"))
}

/// Insert holes numbered `1..=count` for a course.
pub fn generate_holes(conn: &Connection, course_id: CourseId, count: i64) -> Result<()> {
    let now = now_timestamp();
    let mut stmt = conn
        .prepare(
            "INSERT INTO holes (id, course_id, number, created_at, updated_at)
             VALUES (:id, :course_id, :number, :now, :now)",
        )
        .map_err(|e| Error::database(e.to_string()))?;

    for number in 1..=count {
        stmt.execute(rusqlite::named_params! {
            ":id": HoleId::new().to_string(),
            ":course_id": course_id.to_string(),
            ":number": number,
            ":now": &now,
        })
        .map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}

/// Get a course by ID.
pub fn get_course(conn: &Connection, id: CourseId) -> Result<Option<Course>> {
    conn.query_row(
        &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        parse_course_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Find a course by name and location, ignoring case and surrounding whitespace.
pub fn find_course_by_name_location(
    conn: &Connection,
    name: &str,
    location: &str,
) -> Result<Option<Course>> {
    conn.query_row(
        &format!(
            "SELECT {COURSE_COLUMNS} FROM courses
             WHERE LOWER(name) = LOWER(:name) AND LOWER(location) = LOWER(:location)"
        ),
        rusqlite::named_params! {
            ":name": name.trim(),
            ":location": location.trim(),
        },
        parse_course_row,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all courses ordered by name.
pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY name COLLATE NOCASE"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let courses = stmt
        .query_map([], parse_course_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(courses)
}
