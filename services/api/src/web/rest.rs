//! services/api/src/web/rest.rs
//!
//! Contains the health check, the shared error body and the master
//! definition for the OpenAPI specification.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use care_training_core::LoadStatus;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::forms::{FieldErrorBody, FormResponse};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        crate::web::courses::list_courses_handler,
        crate::web::courses::get_course_handler,
        crate::web::courses::list_categories_handler,
        crate::web::courses::merge_calendar_handler,
        crate::web::forms::contact_handler,
        crate::web::forms::booking_handler,
        crate::web::forms::newsletter_handler,
    ),
    components(
        schemas(ErrorResponse, FormResponse, FieldErrorBody, HealthResponse)
    ),
    tags(
        (name = "Care Training API", description = "Course catalogue, calendar pricing and enquiry forms.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Body returned with 4xx responses that carry no field errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// One of `idle`, `loading`, `loaded` or `failed`.
    pub course_database: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Report liveness and whether the remote course database has been merged.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let course_database = match state.courses.load_status() {
        LoadStatus::Idle => "idle",
        LoadStatus::Loading => "loading",
        LoadStatus::Loaded => "loaded",
        LoadStatus::Failed => "failed",
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        course_database: course_database.to_string(),
    })
}
