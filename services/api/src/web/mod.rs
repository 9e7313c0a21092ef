pub mod courses;
pub mod forms;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the handlers so the binary can build the router from one place.
pub use courses::{
    get_course_handler, list_categories_handler, list_courses_handler, merge_calendar_handler,
};
pub use forms::{booking_handler, contact_handler, newsletter_handler};
pub use middleware::capture_request_context;
pub use rest::health_handler;
