//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the course and form endpoints, so the theme's
//! front-end can be checked against it without a running server.
//!
//! Usage: `openapi [OUTPUT]`. The default output is `openapi.json`.

use std::path::{Path, PathBuf};

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = ApiDoc::openapi().to_pretty_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    println!("OpenAPI document for the care training API written to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    write_document(&output)
}
