use std::path::Path;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::auth::{self, AppState};
use crate::chirps;
use crate::metrics::{self, count_hit};
use crate::middleware::{authenticate, require_user};
use crate::users;
use crate::webhooks;

/// Full application: the API plus static files under `/app`, where every
/// request bumps the hit counter.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let files = Router::new()
        .nest_service("/app", ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(state.clone(), count_hit));

    router(state).merge(files)
}

/// All API routes. Everything except the health check, the admin counters and
/// the webhook runs behind `authenticate`; routes that need a caller also sit
/// behind `require_user`.
pub fn router(state: AppState) -> Router {
    let open = Router::new()
        .route("/api/chirps", get(chirps::list_chirps))
        .route("/api/chirps/{chirp_id}", get(chirps::get_chirp))
        .route("/api/users", post(users::create_user))
        .route("/api/login", post(auth::login));

    let guarded = Router::new()
        .route("/api/chirps", post(chirps::create_chirp))
        .route("/api/chirps/{chirp_id}", delete(chirps::delete_chirp))
        .route("/api/users", put(users::update_user))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route_layer(middleware::from_fn(require_user));

    let authenticated = open
        .merge(guarded)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/reset", get(metrics::reset_hits))
        .route("/admin/metrics", get(metrics::admin_metrics))
        .route("/api/polka/webhooks", post(webhooks::upgrade_user))
        .merge(authenticated)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}
