pub mod course_source;
pub mod db;

pub use course_source::{
    create_http_client, load_course_context, FileCourseDatabaseAdapter, HttpCourseDatabaseAdapter,
};
pub use db::DbAdapter;
