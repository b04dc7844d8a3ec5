pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::career::handlers as career;
use crate::courses::handlers as courses;
use crate::state::AppState;

/// Multipart framing on top of the file itself.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size_bytes.saturating_add(BODY_LIMIT_SLACK);
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health::health_handler))
        // Resume analysis
        .route("/upload", post(career::handle_upload))
        .route("/process_resume", post(career::handle_process_resume))
        .route("/process_text", post(career::handle_process_text))
        // Course catalog
        .route(
            "/courses",
            get(courses::handle_list_courses)
                .post(courses::handle_add_course)
                .delete(courses::handle_clear_courses),
        )
        .route("/courses/import", post(courses::handle_import_courses))
        .nest_service("/static", static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
