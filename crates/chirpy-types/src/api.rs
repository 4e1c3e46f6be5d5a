use serde::{Deserialize, Serialize};

// -- Claims token --

/// Payload of the signed claims token. `sub` carries the user id as a
/// decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
}

// -- Errors --

/// Uniform error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Chirps --

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpResponse {
    pub id: u64,
    pub body: String,
    pub author_id: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<u64>,
}

// -- Users --

/// Body of both signup and profile update.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    pub is_privileged: bool,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: u64,
    pub email: String,
    pub is_privileged: bool,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
}

// -- Webhooks --

/// Event delivered by the payment provider. Only `user.upgraded` acts, and
/// only that event needs `data`.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub user_id: u64,
}
