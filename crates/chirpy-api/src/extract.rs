use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

pub const DECODE_ERROR: &str = "Couldn't decode parameters";

/// JSON body extractor whose failures render as the `{"error"}` envelope
/// instead of axum's plain-text rejection. Unknown fields are ignored.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::Validation(DECODE_ERROR.into()))
            }
        }
    }
}

/// Query string counterpart of [`ApiJson`].
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!("Rejected query string: {}", rejection.body_text());
                Err(ApiError::Validation(DECODE_ERROR.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, header},
    };
    use chirpy_types::api::{ChirpQuery, UserRequest};

    fn json_request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn extra_fields_are_ignored() {
        let request = json_request(r#"{"email":"a@b.c","password":"pw","extra":1}"#);
        let ApiJson(user) = ApiJson::<UserRequest>::from_request(request, &()).await.unwrap();
        assert_eq!(user.email, "a@b.c");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let request = json_request(r#"{"email":"#);
        let err = match ApiJson::<UserRequest>::from_request(request, &()).await {
            Ok(_) => panic!("truncated JSON should be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, ApiError::Validation(ref msg) if msg == DECODE_ERROR));
    }

    #[tokio::test]
    async fn bad_query_is_a_validation_error() {
        let (mut parts, _) = http::Request::builder()
            .uri("/api/chirps?author_id=abc")
            .body(())
            .unwrap()
            .into_parts();
        let result = ApiQuery::<ChirpQuery>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
