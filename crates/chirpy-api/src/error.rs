use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use chirpy_db::StoreError;
use chirpy_types::api::ErrorBody;

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

/// Every failure a handler or middleware can surface. Rendered as
/// `{"error": "<message>"}` with the matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// The `Authorization` header is present but not `Bearer <value>`.
    #[error("invalid authentication credentials")]
    InvalidCredentials,

    /// The bearer value failed verification or lookup.
    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("{0}")]
    Unauthorized(String),

    /// Logged in full, rendered as a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidCredentials
            | Self::InvalidAuthenticationToken
            | Self::AuthenticationRequired
            | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap an unexpected failure with a short description of what was attempted.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Internal(format!("{}: {}", context, err))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } | StoreError::NotExist(_) => {
                Self::NotFound(err.to_string())
            }
            StoreError::InvalidToken(_) => Self::InvalidAuthenticationToken,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                error!("{}", detail);
                SERVER_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorBody { error: message });
        if matches!(self, Self::InvalidAuthenticationToken) {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirpy_db::Entity;

    #[test]
    fn store_errors_map_to_http_kinds() {
        let missing: ApiError = StoreError::not_found(Entity::Chirp, 3).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let corrupt: ApiError = StoreError::Corruption("bad json".into()).into();
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid: ApiError = StoreError::InvalidToken("short".into()).into();
        assert!(matches!(invalid, ApiError::InvalidAuthenticationToken));
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_token_sets_challenge_header() {
        let response = ApiError::InvalidAuthenticationToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let response = ApiError::AuthenticationRequired.into_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
