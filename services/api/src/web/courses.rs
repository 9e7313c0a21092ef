//! services/api/src/web/courses.rs
//!
//! Course catalogue and calendar endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use care_training_core::{
    DisplayCourse, MergedCalendarCourse, ScheduledCourse, TopicCategorySummary,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::web::rest::ErrorResponse;
use crate::web::state::AppState;

/// Query parameters accepted by the course listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseQuery {
    /// A topic category key, or a category slug from an old bookmark.
    pub category: Option<String>,
    /// Free-text search over title, description and topics.
    pub q: Option<String>,
}

/// List courses, optionally filtered by category and search text.
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseQuery),
    responses(
        (status = 200, description = "Courses in display form")
    )
)]
pub async fn list_courses_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CourseQuery>,
) -> Json<Vec<DisplayCourse>> {
    Json(state.courses.find_courses(
        query.category.as_deref().unwrap_or_default(),
        query.q.as_deref().unwrap_or_default(),
    ))
}

/// Fetch a single course by id.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = String, Path, description = "The course id.")),
    responses(
        (status = 200, description = "The course in display form"),
        (status = 404, description = "No course with this id", body = ErrorResponse)
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DisplayCourse>, (StatusCode, Json<ErrorResponse>)> {
    state.courses.get_course_by_id(&id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                message: format!("Course {} not found", id),
            }),
        )
    })
}

/// List the topic categories used by the catalogue.
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Topic categories with course counts")
    )
)]
pub async fn list_categories_handler(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<TopicCategorySummary>> {
    Json(state.courses.get_topic_categories())
}

/// Enrich calendar events with course details and pricing.
#[utoipa::path(
    post,
    path = "/calendar/merge",
    request_body(content_type = "application/json", description = "The scheduled course events."),
    responses(
        (status = 200, description = "The merged calendar events, in request order")
    )
)]
pub async fn merge_calendar_handler(
    State(state): State<Arc<AppState>>,
    Json(events): Json<Vec<ScheduledCourse>>,
) -> impl IntoResponse {
    let merged: Vec<MergedCalendarCourse> = state.courses.merge_calendar(&events);
    Json(merged)
}
