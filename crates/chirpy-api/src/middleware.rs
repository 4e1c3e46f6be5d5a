use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use chirpy_db::{RefreshToken, StoreError, TokenValidity, User};

use crate::auth::{AppState, run_db};
use crate::error::ApiError;
use crate::jwt::{Credential, classify};

/// Who is making the request. Inserted into the extensions of every request
/// that passes `authenticate`; both fields are `None` for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user: Option<User>,
    /// Set only when the caller authenticated with a refresh token.
    pub refresh_token: Option<RefreshToken>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user.as_ref().ok_or(ApiError::AuthenticationRequired)
    }

    pub fn require_refresh_token(&self) -> Result<&RefreshToken, ApiError> {
        self.refresh_token
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("this endpoint requires a refresh token".into()))
    }
}

/// Resolve the bearer credential, if any, into an [`Identity`].
///
/// No header means anonymous. A header that is not `Bearer <value>` is
/// rejected outright. Claims tokens must verify and name an existing user.
/// Refresh tokens must exist and be unexpired, but if their user cannot be
/// loaded the request continues anonymously instead of failing.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match bearer_credential(req.headers())? {
        None => Identity::anonymous(),
        Some(credential) => resolve(&state, classify(&credential)).await?,
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Reject requests that reach it without an authenticated user.
pub async fn require_user(req: Request, next: Next) -> Result<Response, ApiError> {
    let authenticated = req
        .extensions()
        .get::<Identity>()
        .is_some_and(|identity| identity.user.is_some());
    if !authenticated {
        return Err(ApiError::AuthenticationRequired);
    }
    Ok(next.run(req).await)
}

fn bearer_credential(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| ApiError::InvalidCredentials)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(credential), None) if !credential.is_empty() => {
            Ok(Some(credential.to_string()))
        }
        _ => Err(ApiError::InvalidCredentials),
    }
}

async fn resolve(state: &AppState, credential: Credential) -> Result<Identity, ApiError> {
    match credential {
        Credential::Claims(token) => {
            let user_id = state.tokens.verify(&token).map_err(|e| {
                debug!("Claims token rejected: {}", e);
                ApiError::InvalidAuthenticationToken
            })?;

            let user = run_db(state, move |db| db.get_user_by_id(user_id))
                .await?
                .map_err(|e| match e {
                    StoreError::NotExist(_) => {
                        debug!("Claims token names missing user {}", user_id);
                        ApiError::InvalidAuthenticationToken
                    }
                    other => ApiError::internal("user lookup failed", other),
                })?;

            Ok(Identity {
                user: Some(user),
                refresh_token: None,
            })
        }
        Credential::Opaque(plaintext) => {
            let lookup = plaintext.clone();
            let validity = run_db(state, move |db| db.validate_refresh_token(&lookup))
                .await?
                .map_err(|e| match e {
                    StoreError::InvalidToken(_) | StoreError::NotExist(_) => {
                        debug!("Refresh token rejected: {}", e);
                        ApiError::InvalidAuthenticationToken
                    }
                    other => ApiError::internal("refresh token lookup failed", other),
                })?;

            let token = match validity {
                TokenValidity::Valid(token) => token,
                TokenValidity::Expired(token) => {
                    debug!("Refresh token {} expired at {}", token.id, token.expiry);
                    return Err(ApiError::InvalidAuthenticationToken);
                }
            };

            let resolved = run_db(state, move |db| {
                let user_id = db.user_for_refresh_token(&plaintext)?;
                db.get_user_by_id(user_id)
            })
            .await?;

            match resolved {
                Ok(user) => Ok(Identity {
                    user: Some(user),
                    refresh_token: Some(token),
                }),
                // Unlike the claims path this does not reject.
                Err(e) => {
                    warn!(
                        "Refresh token {} has no resolvable user, continuing anonymously: {}",
                        token.id, e
                    );
                    Ok(Identity::anonymous())
                }
            }
        }
    }
}
