//! crates/care_training_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The core never fetches or stores anything itself; adapters in the `api`
//! service implement these traits.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{CourseDatabase, FormSubmission};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CourseDatabaseSource: Send + Sync {
    /// Fetches the title-keyed course database (`course-database.json`).
    async fn fetch_course_database(&self) -> PortResult<CourseDatabase>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Persists an accepted submission.
    async fn save_submission(&self, submission: &FormSubmission) -> PortResult<()>;
}

/// Receives the non-fatal events of course data reconciliation.
pub trait CourseDataObserver: Send + Sync {
    /// The raw course source was absent or empty when a listing was requested.
    fn course_source_missing(&self);

    fn database_loaded(&self, entries: usize);

    /// The remote database could not be fetched; the in-memory copy is unchanged.
    fn database_load_failed(&self, error: &PortError);
}

/// Default observer: everything goes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CourseDataObserver for TracingObserver {
    fn course_source_missing(&self) {
        warn!("Course data not loaded yet; returning an empty course list");
    }

    fn database_loaded(&self, entries: usize) {
        info!(entries, "Course database merged");
    }

    fn database_load_failed(&self, error: &PortError) {
        debug!(error = %error, "Could not load course database; keeping existing data");
    }
}
