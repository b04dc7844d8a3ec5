//! Axum route handlers for the course catalog.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

use crate::courses::catalog::{
    add_course, import_courses, list_courses, CourseMeta, CourseRecord, ImportSummary,
};
use crate::errors::AppError;
use crate::state::AppState;
use crate::vector::COURSE_COLLECTION;

#[derive(Debug, Serialize)]
pub struct AddCourseResponse {
    pub message: String,
    pub catalog_size: usize,
}

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub total: usize,
    pub courses: Vec<CourseMeta>,
}

/// GET /courses
pub async fn handle_list_courses(
    State(state): State<AppState>,
) -> Result<Json<CourseListResponse>, AppError> {
    let courses = list_courses(&state.vectors).await?;
    Ok(Json(CourseListResponse {
        total: courses.len(),
        courses,
    }))
}

/// DELETE /courses
///
/// Empties the catalog; resumes are untouched.
pub async fn handle_clear_courses(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.vectors.clear(COURSE_COLLECTION).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /courses
///
/// Adds one course to the catalog.
pub async fn handle_add_course(
    State(state): State<AppState>,
    Json(course): Json<CourseRecord>,
) -> Result<(StatusCode, Json<AddCourseResponse>), AppError> {
    course.validate()?;
    add_course(&state.vectors, &course).await?;

    let catalog_size = state.vectors.len(COURSE_COLLECTION).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddCourseResponse {
            message: format!("Added '{}' to the course catalog.", course.title.trim()),
            catalog_size,
        }),
    ))
}

/// POST /courses/import
///
/// Bulk-imports a scraper export (a JSON array of course objects).
pub async fn handle_import_courses(
    State(state): State<AppState>,
    Json(entries): Json<Vec<Value>>,
) -> Result<Json<ImportSummary>, AppError> {
    let summary = import_courses(&state.vectors, entries).await?;
    Ok(Json(summary))
}
