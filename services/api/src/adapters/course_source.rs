//! services/api/src/adapters/course_source.rs
//!
//! Adapters for the `CourseDatabaseSource` port, plus the startup loader for the
//! course files the server renders into every page.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use care_training_core::{
    CourseDataContext, CourseDatabase, CourseDatabaseSource, PortError, PortResult,
    RawCourseSource,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ApiError;

/// Creates the HTTP client used for the remote course database.
pub fn create_http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("care-training-site/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

//=========================================================================================
// HTTP Source
//=========================================================================================

/// Fetches `course-database.json` from the theme's public assets.
pub struct HttpCourseDatabaseAdapter {
    client: reqwest::Client,
    url: String,
}

impl HttpCourseDatabaseAdapter {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CourseDatabaseSource for HttpCourseDatabaseAdapter {
    async fn fetch_course_database(&self) -> PortResult<CourseDatabase> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PortError::Unavailable(format!("{}: {}", self.url, e)))?;

        response
            .json::<CourseDatabase>()
            .await
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.url, e)))
    }
}

//=========================================================================================
// File Source
//=========================================================================================

/// Reads `course-database.json` from a local `assets/data` directory.
pub struct FileCourseDatabaseAdapter {
    path: PathBuf,
}

impl FileCourseDatabaseAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CourseDatabaseSource for FileCourseDatabaseAdapter {
    async fn fetch_course_database(&self) -> PortResult<CourseDatabase> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PortError::NotFound(self.path.display().to_string()),
            _ => PortError::Unavailable(e.to_string()),
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PortError::Unexpected(format!("{}: {}", self.path.display(), e)))
    }
}

//=========================================================================================
// Startup Course Context
//=========================================================================================

/// Reads a JSON file. A missing or malformed file is logged and reads as `None`.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ApiError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed JSON file");
            Ok(None)
        }
    }
}

/// Loads the raw course list, the seed course database and the site-wide discount.
///
/// Missing or malformed files are not fatal: the catalogue then reports itself as not loaded.
pub fn load_course_context(config: &Config) -> Result<CourseDataContext, ApiError> {
    let raw_courses = read_json_file::<RawCourseSource>(&config.course_data_path)?
        .map(RawCourseSource::into_records);
    match &raw_courses {
        Some(courses) => info!(count = courses.len(), "Loaded course list"),
        None => warn!(
            path = %config.course_data_path.display(),
            "Course list unavailable; course listings will be empty"
        ),
    }

    let course_database = match &config.course_database_seed_path {
        Some(path) => read_json_file::<CourseDatabase>(path)?.unwrap_or_default(),
        None => CourseDatabase::new(),
    };

    Ok(CourseDataContext {
        raw_courses,
        course_database,
        sitewide_discount: config.sitewide_discount.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn file_source_reads_title_keyed_database() {
        let file = write_temp(r#"{ "First Aid": { "price": 95, "level": "Level 3" } }"#);
        let database = FileCourseDatabaseAdapter::new(file.path())
            .fetch_course_database()
            .await
            .unwrap();

        assert_eq!(database["First Aid"].price(), Some(95.0));
        assert_eq!(database["First Aid"].text("level"), Some("Level 3"));
    }

    #[tokio::test]
    async fn file_source_reports_missing_file() {
        let result = FileCourseDatabaseAdapter::new("/nonexistent/course-database.json")
            .fetch_course_database()
            .await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }

    #[tokio::test]
    async fn file_source_rejects_malformed_json() {
        let file = write_temp("[1, 2, 3]");
        let result = FileCourseDatabaseAdapter::new(file.path())
            .fetch_course_database()
            .await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }

    #[test]
    fn startup_context_tolerates_missing_course_list() {
        let seed = write_temp(r#"{ "Fire Marshal": { "price": 60 } }"#);
        let mut config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/site".into()),
            "COURSE_DATA_PATH" => Some("/nonexistent/courses.json".into()),
            _ => None,
        })
        .unwrap();
        config.course_database_seed_path = Some(seed.path().to_path_buf());

        let context = load_course_context(&config).unwrap();

        assert!(context.raw_courses.is_none());
        assert!(context.course_database.contains_key("Fire Marshal"));
    }

    #[test]
    fn startup_context_reads_course_list() {
        let courses = write_temp(
            r#"[{ "id": 1, "title": "Fire Marshal", "topicCategories": ["Health & Safety"] }]"#,
        );
        let path = courses.path().display().to_string();
        let config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/site".into()),
            "COURSE_DATA_PATH" => Some(path.clone()),
            _ => None,
        })
        .unwrap();

        let context = load_course_context(&config).unwrap();
        let courses = context.raw_courses.unwrap();
        assert_eq!(courses[0].id, "1");
        assert_eq!(courses[0].topic_categories, vec!["Health & Safety".to_string()]);
    }

    #[test]
    fn startup_context_survives_loosely_shaped_course_list() {
        let courses = write_temp(
            r#"[
                { "id": 1, "title": "Fire Marshal", "description": null, "duration": 6, "featured": null },
                { "id": 2, "title": "Broken", "learningOutcomes": { "a": 1 } }
            ]"#,
        );
        let seed = write_temp("{ not json");
        let path = courses.path().display().to_string();
        let mut config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/site".into()),
            "COURSE_DATA_PATH" => Some(path.clone()),
            _ => None,
        })
        .unwrap();
        config.course_database_seed_path = Some(seed.path().to_path_buf());

        let context = load_course_context(&config).unwrap();

        let courses = context.raw_courses.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].duration, "6");
        assert!(context.course_database.is_empty());
    }

    #[test]
    fn startup_context_ignores_unreadable_course_list() {
        let courses = write_temp("\"just a string\"");
        let path = courses.path().display().to_string();
        let config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("postgres://localhost/site".into()),
            "COURSE_DATA_PATH" => Some(path.clone()),
            _ => None,
        })
        .unwrap();

        let context = load_course_context(&config).unwrap();
        assert!(context.raw_courses.is_none());
    }
}
