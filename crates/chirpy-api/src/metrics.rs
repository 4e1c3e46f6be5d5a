use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, Response},
};
use tracing::info;

use crate::auth::AppState;

/// Counts every request that reaches the static file server.
pub async fn count_hit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.file_server_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// GET /admin/metrics
pub async fn admin_metrics(State(state): State<AppState>) -> Html<String> {
    let hits = state.file_server_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n    <body>\n        <h1>Welcome, Chirpy Admin</h1>\n        \
         <p>Chirpy has been visited {} times!</p>\n    </body>\n</html>",
        hits
    ))
}

/// GET /api/reset
pub async fn reset_hits(State(state): State<AppState>) -> &'static str {
    state.file_server_hits.store(0, Ordering::Relaxed);
    info!("File server hit counter reset");
    "File server hits count has been reset to 0"
}
