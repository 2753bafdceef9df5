//! Static File Serving
//!
//! Serves the upload front-end from the configured static directory.

use std::path::Path;

use tower_http::services::ServeDir;

/// Service for everything not matched by an API route
pub fn service(static_dir: &Path) -> ServeDir {
    if static_dir.is_dir() {
        tracing::info!(path = %static_dir.display(), "Serving static files");
    } else {
        tracing::warn!(
            path = %static_dir.display(),
            "Static files directory not found, front-end will not be served"
        );
    }

    ServeDir::new(static_dir).append_index_html_on_directories(true)
}
