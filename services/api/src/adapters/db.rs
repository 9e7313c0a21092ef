//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SubmissionRepository` port from the core crate. It stores accepted form
//! submissions in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use care_training_core::{FormSubmission, PortError, PortResult, SubmissionRepository};
use sqlx::PgPool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SubmissionRepository` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// `SubmissionRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubmissionRepository for DbAdapter {
    async fn save_submission(&self, submission: &FormSubmission) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO form_submissions \
             (id, form_type, name, email, phone, message, course_title, course_date, attendees, \
              ip, user_agent, referrer, time_taken, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(submission.id)
        .bind(submission.kind.as_str())
        .bind(submission.name.as_deref())
        .bind(&submission.email)
        .bind(submission.phone.as_deref())
        .bind(submission.message.as_deref())
        .bind(submission.course_title.as_deref())
        .bind(submission.course_date.as_deref())
        .bind(submission.attendees.map(|n| n as i32))
        .bind(&submission.metadata.ip)
        .bind(&submission.metadata.user_agent)
        .bind(&submission.metadata.referrer)
        .bind(submission.metadata.time_taken)
        .bind(submission.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
