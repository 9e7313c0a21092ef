//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use care_training_core::{CourseDataManager, FormIntake, SubmissionRepository};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub courses: CourseDataManager,
    pub intake: FormIntake,
    pub submissions: Arc<dyn SubmissionRepository>,
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use care_training_core::{
        CourseDataContext, CourseDatabase, CourseDatabaseSource, FormSubmission, PortError,
        PortResult,
    };
    use std::sync::Mutex;

    /// Keeps submissions in memory; fails every save when `fail` is set.
    #[derive(Default)]
    pub(crate) struct MemorySubmissions {
        pub saved: Mutex<Vec<FormSubmission>>,
        pub fail: bool,
    }

    #[async_trait]
    impl SubmissionRepository for MemorySubmissions {
        async fn save_submission(&self, submission: &FormSubmission) -> PortResult<()> {
            if self.fail {
                return Err(PortError::Unavailable("database is down".into()));
            }
            self.saved.lock().unwrap().push(submission.clone());
            Ok(())
        }
    }

    pub(crate) struct EmptySource;

    #[async_trait]
    impl CourseDatabaseSource for EmptySource {
        async fn fetch_course_database(&self) -> PortResult<CourseDatabase> {
            Ok(CourseDatabase::new())
        }
    }

    pub(crate) fn test_config() -> Config {
        Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/test".to_string()),
            _ => None,
        })
        .unwrap()
    }

    pub(crate) fn test_state(
        context: CourseDataContext,
        submissions: Arc<MemorySubmissions>,
    ) -> Arc<AppState> {
        let config = test_config();
        Arc::new(AppState {
            intake: FormIntake::new(config.anti_bot),
            config: Arc::new(config),
            courses: CourseDataManager::new(context, Arc::new(EmptySource)),
            submissions,
        })
    }
}
