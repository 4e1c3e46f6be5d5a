use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Duration;
use tracing::{debug, error, info};

use chirpy_db::{Database, StoreError, users::verify_password};
use chirpy_types::api::{LoginRequest, LoginResponse, RefreshResponse};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::jwt::TokenService;
use crate::middleware::Identity;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub config: AppConfig,
    /// Requests served under `/app` since start or the last reset.
    pub file_server_hits: AtomicU64,
}

impl AppStateInner {
    pub fn new(db: Database, config: AppConfig) -> AppState {
        let tokens = TokenService::new(&config.jwt_secret);
        Arc::new(Self {
            db,
            tokens,
            config,
            file_server_hits: AtomicU64::new(0),
        })
    }
}

/// Run a store operation off the async runtime. The outer error is a join
/// failure; the inner result is the store's own so callers can match on it.
pub(crate) async fn run_db<F, T>(
    state: &AppState,
    f: F,
) -> Result<chirpy_db::Result<T>, ApiError>
where
    F: FnOnce(&Database) -> chirpy_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("store task failed", e)
        })
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.clone();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .map_err(|e| match e {
            StoreError::NotExist(_) => {
                ApiError::Validation("No user with this email exists".into())
            }
            other => ApiError::internal("Problem checking database", other),
        })?;

    let password = req.password;
    let password_hash = user.password_hash.clone();
    let matches = run_db(&state, move |_| verify_password(&password, &password_hash))
        .await?
        .map_err(|e| ApiError::internal("password verification failed", e))?;
    if !matches {
        debug!("Wrong password for user {}", user.id);
        return Err(ApiError::Unauthorized("Password is incorrect".into()));
    }

    let requested_ttl = req.expires_in_seconds.and_then(Duration::try_seconds);
    let token = state
        .tokens
        .issue(user.id, requested_ttl)
        .map_err(|e| ApiError::internal("Could not create JWT", e))?;

    let user_id = user.id;
    let refresh_token = run_db(&state, move |db| db.issue_refresh_token(user_id))
        .await?
        .map_err(|e| ApiError::internal("Could not create refresh token", e))?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        is_privileged: user.is_privileged,
        token,
        refresh_token: refresh_token.plaintext,
    }))
}

/// POST /api/refresh — exchange the presented refresh token for a new claims token.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    identity.require_refresh_token()?;
    let user = identity.require_user()?;

    let token = state
        .tokens
        .issue(user.id, None)
        .map_err(|e| ApiError::internal("Could not create JWT", e))?;

    debug!("Issued claims token for user {} from refresh token", user.id);
    Ok(Json(RefreshResponse { token }))
}

/// POST /api/revoke — delete the presented refresh token.
pub async fn revoke(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let token_id = identity.require_refresh_token()?.id;

    run_db(&state, move |db| db.revoke_refresh_token(token_id))
        .await?
        .map_err(|e| match e {
            // Revoked concurrently by another request.
            StoreError::NotFound { .. } => ApiError::InvalidAuthenticationToken,
            other => ApiError::internal("Could not revoke refresh token", other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
