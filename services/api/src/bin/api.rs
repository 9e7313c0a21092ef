//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        course_source::{
            create_http_client, load_course_context, FileCourseDatabaseAdapter,
            HttpCourseDatabaseAdapter,
        },
        db::DbAdapter,
    },
    config::{Config, CourseDatabaseLocation},
    error::ApiError,
    web::{
        booking_handler, capture_request_context, contact_handler, get_course_handler,
        health_handler, list_categories_handler, list_courses_handler, merge_calendar_handler,
        newsletter_handler, rest::ApiDoc, state::AppState,
    },
};
use axum::{
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use care_training_core::{CourseDataManager, CourseDatabaseSource, FormIntake};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Load Course Data ---
    let course_source: Arc<dyn CourseDatabaseSource> = match &config.course_database {
        CourseDatabaseLocation::Remote(url) => {
            info!(%url, "Using remote course database");
            let client = create_http_client(config.http_timeout_secs)?;
            Arc::new(HttpCourseDatabaseAdapter::new(client, url.clone()))
        }
        CourseDatabaseLocation::LocalFile(path) => {
            info!(path = %path.display(), "Using local course database");
            Arc::new(FileCourseDatabaseAdapter::new(path.clone()))
        }
    };
    let context = load_course_context(&config)?;
    let courses = CourseDataManager::new(context, course_source);
    // Warm the database in the background; listings work from the seed until it lands.
    courses.trigger_database_load();

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        intake: FormIntake::new(config.anti_bot),
        config: config.clone(),
        courses,
        submissions: db_adapter,
    });

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);
    if let Some(origin) = &config.cors_allowed_origin {
        let origin = origin.parse::<HeaderValue>().map_err(|e| {
            ApiError::Internal(format!("Invalid CORS origin '{}': {}", origin, e))
        })?;
        cors = cors.allow_origin(origin);
    }

    // --- 5. Create the Web Router ---
    let form_routes = Router::new()
        .route("/forms/contact", post(contact_handler))
        .route("/forms/booking", post(booking_handler))
        .route("/forms/newsletter", post(newsletter_handler))
        .layer(axum_middleware::from_fn(capture_request_context));

    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/courses", get(list_courses_handler))
        .route("/courses/{id}", get(get_course_handler))
        .route("/categories", get(list_categories_handler))
        .route("/calendar/merge", post(merge_calendar_handler))
        .merge(form_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
