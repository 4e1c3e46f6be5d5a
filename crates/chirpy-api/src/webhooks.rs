use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use tracing::{debug, info, warn};

use chirpy_db::StoreError;
use chirpy_types::api::WebhookEvent;

use crate::auth::{AppState, run_db};
use crate::error::ApiError;
use crate::extract::{ApiJson, DECODE_ERROR};

pub const USER_UPGRADED: &str = "user.upgraded";

fn has_api_key(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("ApiKey "))
        .is_some_and(|key| key == expected)
}

/// POST /api/polka/webhooks — payment provider callback. Only `user.upgraded`
/// does anything; every accepted event answers 204.
pub async fn upgrade_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(event): ApiJson<WebhookEvent>,
) -> Result<StatusCode, ApiError> {
    if let Some(expected) = &state.config.polka_key {
        if !has_api_key(&headers, expected) {
            return Err(ApiError::InvalidCredentials);
        }
    }

    if event.event != USER_UPGRADED {
        debug!("Ignoring webhook event {:?}", event.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let Some(data) = event.data else {
        return Err(ApiError::Validation(DECODE_ERROR.into()));
    };
    let user_id = data.user_id;
    match run_db(&state, move |db| db.set_privileged(user_id)).await? {
        Ok(()) => info!("Webhook upgraded user {}", user_id),
        Err(StoreError::NotExist(_)) => warn!("Upgrade event for unknown user {}", user_id),
        Err(e) => return Err(ApiError::internal("Could not upgrade user", e)),
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn api_key_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(!has_api_key(&headers, "k3y"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("ApiKey k3y"));
        assert!(has_api_key(&headers, "k3y"));
        assert!(!has_api_key(&headers, "other"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer k3y"));
        assert!(!has_api_key(&headers, "k3y"));
    }
}
