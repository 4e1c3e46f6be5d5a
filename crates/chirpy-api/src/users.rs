use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use chirpy_db::{StoreError, User};
use chirpy_types::api::{UserRequest, UserResponse};

use crate::auth::{AppState, run_db};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::Identity;

/// Outward view of a user. The password hash never leaves the store.
pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        is_privileged: user.is_privileged,
    }
}

/// Minimal address check: one `@` with something on both sides and no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn validate(req: &UserRequest) -> Result<(), ApiError> {
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("Not a valid email".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password must be provided".into()));
    }
    Ok(())
}

/// POST /api/users — sign up.
///
/// The existence check and the insert take the store lock separately, so two
/// concurrent signups with the same email can both succeed.
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_email(&req.email) {
        return Err(ApiError::Validation("Not a valid email".into()));
    }

    let email = req.email.clone();
    let exists = run_db(&state, move |db| db.email_exists(&email))
        .await?
        .map_err(|e| ApiError::internal("Problems accessing database", e))?;
    if exists {
        return Err(ApiError::AlreadyExists(
            "Account with that email address already exists".into(),
        ));
    }

    if req.password.is_empty() {
        return Err(ApiError::Validation("Password must be provided".into()));
    }

    let user = run_db(&state, move |db| db.create_user(&req.email, &req.password))
        .await?
        .map_err(|e| ApiError::internal("Couldn't create user", e))?;

    Ok((StatusCode::CREATED, Json(user_response(&user))))
}

/// PUT /api/users — replace the caller's email and password.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user()?.id;
    validate(&req)?;

    let email = req.email.clone();
    match run_db(&state, move |db| db.get_user_by_email(&email)).await? {
        Ok(owner) if owner.id != user_id => {
            return Err(ApiError::AlreadyExists(
                "Account with that email address already exists".into(),
            ));
        }
        Ok(_) | Err(StoreError::NotExist(_)) => {}
        Err(e) => return Err(ApiError::internal("Problems accessing database", e)),
    }

    let user = run_db(&state, move |db| db.update_user(user_id, &req.email, &req.password))
        .await?
        .map_err(|e| match e {
            StoreError::NotExist(_) => ApiError::AuthenticationRequired,
            other => ApiError::internal("Problem updating user info", other),
        })?;

    info!("User {} updated their profile", user.id);
    Ok(Json(user_response(&user)))
}
