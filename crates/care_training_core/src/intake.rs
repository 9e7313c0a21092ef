//! crates/care_training_core/src/intake.rs
//!
//! Turns a raw form post into an accepted `FormSubmission`.
//!
//! Every submission goes through the same steps: anti-bot screening first, then field
//! validation, and only then is it accepted. A rejection at any step is final for that
//! request; the client has to submit again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{FormKind, FormSubmission};
use crate::validation::{
    validate_anti_bot, validate_email, validate_name, validate_uk_phone, AntiBotFields,
    AntiBotPolicy, AntiBotRejection, FieldResult, RequestContext, ValidationError,
};

const MESSAGE_MAX_CHARS: usize = 5000;
const MAX_ATTENDEES: u32 = 20;

//=========================================================================================
// Raw Form Inputs
//=========================================================================================

/// The contact form, exactly as posted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub course: String,
}

/// The course booking form, exactly as posted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub course_title: String,
    pub course_date: String,
    pub attendees: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsletterForm {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum FormInput {
    Contact(ContactForm),
    Booking(BookingForm),
    Newsletter(NewsletterForm),
}

impl FormInput {
    pub fn kind(&self) -> FormKind {
        match self {
            FormInput::Contact(_) => FormKind::Contact,
            FormInput::Booking(_) => FormKind::Booking,
            FormInput::Newsletter(_) => FormKind::Newsletter,
        }
    }
}

//=========================================================================================
// Rejections
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeRejection {
    #[error("submission looks automated: {0}")]
    Bot(AntiBotRejection),
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

/// Collects every field error instead of stopping at the first one.
#[derive(Default)]
struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    fn check<T>(&mut self, field: &'static str, result: FieldResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(FieldError {
                    field,
                    message: e.message,
                });
                None
            }
        }
    }

    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// A free-text field; `None` when blank and optional.
    fn text(
        &mut self,
        field: &'static str,
        label: &str,
        value: &str,
        required: bool,
        max_chars: usize,
    ) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            if required {
                self.fail(field, format!("{} is required.", label));
            }
            return None;
        }
        if value.chars().count() > max_chars {
            self.fail(
                field,
                format!("{} must be at most {} characters.", label, max_chars),
            );
            return None;
        }
        Some(value.to_string())
    }
}

/// Fields that survived validation, before metadata is attached.
#[derive(Default)]
struct ValidFields {
    name: Option<String>,
    email: String,
    phone: Option<String>,
    message: Option<String>,
    course_title: Option<String>,
    course_date: Option<String>,
    attendees: Option<u32>,
}

fn parse_attendees(raw: &str) -> FieldResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }
    match raw.parse::<u32>() {
        Ok(n) if (1..=MAX_ATTENDEES).contains(&n) => Ok(n),
        _ => Err(ValidationError {
            message: format!("Please choose between 1 and {} attendees.", MAX_ATTENDEES),
        }),
    }
}

//=========================================================================================
// FormIntake
//=========================================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct FormIntake {
    policy: AntiBotPolicy,
}

impl FormIntake {
    pub fn new(policy: AntiBotPolicy) -> Self {
        Self { policy }
    }

    /// Screens, validates and accepts one submission.
    pub fn accept(
        &self,
        input: &FormInput,
        anti_bot: &AntiBotFields,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<FormSubmission, IntakeRejection> {
        let metadata =
            validate_anti_bot(anti_bot, request, &self.policy, now).map_err(IntakeRejection::Bot)?;

        let mut checks = FieldChecks::default();
        let fields = match input {
            FormInput::Contact(form) => validate_contact(form, &mut checks),
            FormInput::Booking(form) => validate_booking(form, &mut checks),
            FormInput::Newsletter(form) => validate_newsletter(form, &mut checks),
        };
        if !checks.errors.is_empty() {
            return Err(IntakeRejection::Invalid(checks.errors));
        }

        Ok(FormSubmission {
            id: Uuid::new_v4(),
            kind: input.kind(),
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            message: fields.message,
            course_title: fields.course_title,
            course_date: fields.course_date,
            attendees: fields.attendees,
            metadata,
            created_at: now,
        })
    }
}

fn validate_contact(form: &ContactForm, checks: &mut FieldChecks) -> ValidFields {
    let name = checks.check("name", validate_name(&form.name));
    let email = checks.check("email", validate_email(&form.email, true)).flatten();
    let phone = if form.phone.trim().is_empty() {
        None
    } else {
        checks.check("phone", validate_uk_phone(&form.phone))
    };
    let message = checks.text("message", "Message", &form.message, true, MESSAGE_MAX_CHARS);
    let course_title = checks.text("course", "Course", &form.course, false, 200);

    ValidFields {
        name,
        email: email.unwrap_or_default(),
        phone,
        message,
        course_title,
        ..Default::default()
    }
}

fn validate_booking(form: &BookingForm, checks: &mut FieldChecks) -> ValidFields {
    let name = checks.check("name", validate_name(&form.name));
    let email = checks.check("email", validate_email(&form.email, true)).flatten();
    let phone = checks.check("phone", validate_uk_phone(&form.phone));
    let course_title = checks.text("course_title", "Course", &form.course_title, true, 200);
    let course_date = checks.text("course_date", "Course date", &form.course_date, true, 100);
    let attendees = checks.check("attendees", parse_attendees(&form.attendees));
    let message = checks.text("message", "Message", &form.message, false, MESSAGE_MAX_CHARS);

    ValidFields {
        name,
        email: email.unwrap_or_default(),
        phone,
        message,
        course_title,
        course_date,
        attendees,
    }
}

fn validate_newsletter(form: &NewsletterForm, checks: &mut FieldChecks) -> ValidFields {
    let email = checks.check("email", validate_email(&form.email, true)).flatten();
    let name = if form.name.trim().is_empty() {
        None
    } else {
        checks.check("name", validate_name(&form.name))
    };

    ValidFields {
        name,
        email: email.unwrap_or_default(),
        ..Default::default()
    }
}
