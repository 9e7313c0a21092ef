//! services/api/src/web/forms.rs
//!
//! AJAX endpoints for the contact, booking and newsletter forms.

use std::sync::Arc;

use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    response::Json,
};
use care_training_core::intake::{BookingForm, ContactForm, NewsletterForm};
use care_training_core::{AntiBotFields, FormInput, FormKind, IntakeRejection, RequestContext};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::state::AppState;

/// Shown for anything the visitor cannot fix themselves, including anti-bot rejections.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, we could not process your submission. Please try again.";
const INVALID_FIELDS_MESSAGE: &str = "Please correct the highlighted fields and try again.";

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// The hidden fields posted alongside every form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AntiBotPayload {
    pub website: String,
    pub form_loaded_at: String,
}

impl AntiBotPayload {
    /// Unparsable timestamps count as missing, which skips the timing check.
    fn into_fields(self) -> AntiBotFields {
        AntiBotFields {
            website: self.website,
            form_loaded_at: self.form_loaded_at.trim().parse().unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    #[serde(flatten)]
    pub form: ContactForm,
    #[serde(flatten)]
    pub anti_bot: AntiBotPayload,
}

#[derive(Debug, Deserialize)]
pub struct BookingPayload {
    #[serde(flatten)]
    pub form: BookingForm,
    #[serde(flatten)]
    pub anti_bot: AntiBotPayload,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterPayload {
    #[serde(flatten)]
    pub form: NewsletterForm,
    #[serde(flatten)]
    pub anti_bot: AntiBotPayload,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorBody>,
}

type FormReply = (StatusCode, Json<FormResponse>);

fn generic_failure() -> FormReply {
    (
        StatusCode::BAD_REQUEST,
        Json(FormResponse {
            success: false,
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            errors: Vec::new(),
        }),
    )
}

fn success_message(kind: FormKind) -> &'static str {
    match kind {
        FormKind::Contact => "Thank you for your message. We will be in touch shortly.",
        FormKind::Booking => "Thank you for your booking request. We will confirm your place by email.",
        FormKind::Newsletter => "Thank you for subscribing to our newsletter.",
    }
}

//=========================================================================================
// Shared Submission Flow
//=========================================================================================

async fn process_submission(
    state: &AppState,
    input: FormInput,
    anti_bot: AntiBotFields,
    request: &RequestContext,
) -> FormReply {
    let kind = input.kind();
    let submission = match state.intake.accept(&input, &anti_bot, request, Utc::now()) {
        Ok(submission) => submission,
        Err(IntakeRejection::Bot(reason)) => {
            warn!(form = %kind, ip = %request.client_ip(), %reason, "Submission rejected by anti-bot screening");
            return generic_failure();
        }
        Err(IntakeRejection::Invalid(errors)) => {
            info!(form = %kind, failed = errors.len(), "Submission failed validation");
            let errors = errors
                .into_iter()
                .map(|e| FieldErrorBody {
                    field: e.field.to_string(),
                    message: e.message,
                })
                .collect();
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(FormResponse {
                    success: false,
                    message: INVALID_FIELDS_MESSAGE.to_string(),
                    errors,
                }),
            );
        }
    };

    if let Err(e) = state.submissions.save_submission(&submission).await {
        error!("Failed to save {} submission: {:?}", kind, e);
        return generic_failure();
    }

    info!(form = %kind, id = %submission.id, "Submission accepted");
    (
        StatusCode::OK,
        Json(FormResponse {
            success: true,
            message: success_message(kind).to_string(),
            errors: Vec::new(),
        }),
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /forms/contact - Submit the contact form
#[utoipa::path(
    post,
    path = "/forms/contact",
    request_body(content_type = "application/x-www-form-urlencoded", description = "name, email, phone, message, course, website, form_loaded_at"),
    responses(
        (status = 200, description = "Message received", body = FormResponse),
        (status = 400, description = "Submission could not be processed", body = FormResponse),
        (status = 422, description = "One or more fields are invalid", body = FormResponse)
    )
)]
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(request): Extension<RequestContext>,
    Form(payload): Form<ContactPayload>,
) -> FormReply {
    process_submission(
        &state,
        FormInput::Contact(payload.form),
        payload.anti_bot.into_fields(),
        &request,
    )
    .await
}

/// POST /forms/booking - Request a place on a course
#[utoipa::path(
    post,
    path = "/forms/booking",
    request_body(content_type = "application/x-www-form-urlencoded", description = "name, email, phone, course_title, course_date, attendees, message, website, form_loaded_at"),
    responses(
        (status = 200, description = "Booking request received", body = FormResponse),
        (status = 400, description = "Submission could not be processed", body = FormResponse),
        (status = 422, description = "One or more fields are invalid", body = FormResponse)
    )
)]
pub async fn booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(request): Extension<RequestContext>,
    Form(payload): Form<BookingPayload>,
) -> FormReply {
    process_submission(
        &state,
        FormInput::Booking(payload.form),
        payload.anti_bot.into_fields(),
        &request,
    )
    .await
}

/// POST /forms/newsletter - Subscribe to the newsletter
#[utoipa::path(
    post,
    path = "/forms/newsletter",
    request_body(content_type = "application/x-www-form-urlencoded", description = "email, name, website, form_loaded_at"),
    responses(
        (status = 200, description = "Subscribed", body = FormResponse),
        (status = 400, description = "Submission could not be processed", body = FormResponse),
        (status = 422, description = "One or more fields are invalid", body = FormResponse)
    )
)]
pub async fn newsletter_handler(
    State(state): State<Arc<AppState>>,
    Extension(request): Extension<RequestContext>,
    Form(payload): Form<NewsletterPayload>,
) -> FormReply {
    process_submission(
        &state,
        FormInput::Newsletter(payload.form),
        payload.anti_bot.into_fields(),
        &request,
    )
    .await
}
