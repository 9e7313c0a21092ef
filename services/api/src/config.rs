//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use care_training_core::{AntiBotPolicy, SiteWideDiscount};
use tracing::Level;

const COURSE_DATABASE_FILE: &str = "course-database.json";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the title-keyed course database is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CourseDatabaseLocation {
    Remote(String),
    LocalFile(PathBuf),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub course_data_path: PathBuf,
    pub course_database_seed_path: Option<PathBuf>,
    pub course_database: CourseDatabaseLocation,
    pub sitewide_discount: Option<SiteWideDiscount>,
    pub anti_bot: AntiBotPolicy,
    pub cors_allowed_origin: Option<String>,
    pub http_timeout_secs: u64,
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a boolean", other),
        )),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Course Data Sources ---
        let course_data_path = var("COURSE_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./assets/data/courses.json"));
        let course_database_seed_path = var("COURSE_DATABASE_SEED_PATH").map(PathBuf::from);

        let course_database = if let Some(url) = var("COURSE_DATABASE_URL") {
            CourseDatabaseLocation::Remote(url)
        } else if let Some(theme_url) = var("THEME_URL") {
            CourseDatabaseLocation::Remote(format!(
                "{}/assets/data/{}",
                theme_url.trim_end_matches('/'),
                COURSE_DATABASE_FILE
            ))
        } else {
            let assets_dir = var("COURSE_ASSETS_DIR").unwrap_or_else(|| "./assets/data".to_string());
            CourseDatabaseLocation::LocalFile(PathBuf::from(assets_dir).join(COURSE_DATABASE_FILE))
        };

        // --- Site-wide Discount ---
        let sitewide_discount = match var("SITEWIDE_DISCOUNT_ACTIVE") {
            Some(raw) => {
                let percentage: f64 = parse_var(
                    "SITEWIDE_DISCOUNT_PERCENTAGE",
                    var("SITEWIDE_DISCOUNT_PERCENTAGE"),
                    0.0,
                )?;
                if !(0.0..=100.0).contains(&percentage) {
                    return Err(ConfigError::InvalidValue(
                        "SITEWIDE_DISCOUNT_PERCENTAGE".to_string(),
                        format!("{} is not between 0 and 100", percentage),
                    ));
                }
                Some(SiteWideDiscount {
                    active: parse_flag("SITEWIDE_DISCOUNT_ACTIVE", &raw)?,
                    percentage,
                    label: var("SITEWIDE_DISCOUNT_LABEL").unwrap_or_default(),
                })
            }
            None => None,
        };

        // --- Form Screening ---
        let defaults = AntiBotPolicy::default();
        let anti_bot = AntiBotPolicy {
            min_seconds: parse_var("FORM_MIN_SECONDS", var("FORM_MIN_SECONDS"), defaults.min_seconds)?,
            max_seconds: parse_var(
                "FORM_MAX_AGE_SECONDS",
                var("FORM_MAX_AGE_SECONDS"),
                defaults.max_seconds,
            )?,
        };

        let cors_allowed_origin = var("CORS_ALLOWED_ORIGIN");
        let http_timeout_secs = parse_var("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"), 10)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            course_data_path,
            course_database_seed_path,
            course_database,
            sitewide_discount,
            anti_bot,
            cors_allowed_origin,
            http_timeout_secs,
        })
    }
}
