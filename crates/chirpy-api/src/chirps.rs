use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use chirpy_db::{Chirp, StoreError};
use chirpy_types::api::{ChirpQuery, ChirpResponse, CreateChirpRequest};

use crate::auth::{AppState, run_db};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::Identity;

pub const MAX_CHIRP_LENGTH: usize = 140;

const REPLACEMENT: &str = "****";
const BANNED_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

/// Replace banned words with `****`. A word only matches when it equals a
/// banned word case-insensitively with nothing attached, so "Sharbert!"
/// survives. Whitespace runs collapse to single spaces.
pub fn clean_body(body: &str) -> String {
    body.split_whitespace()
        .map(|word| {
            if BANNED_WORDS.contains(&word.to_lowercase().as_str()) {
                REPLACEMENT
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn chirp_response(chirp: Chirp) -> ChirpResponse {
    ChirpResponse {
        id: chirp.id,
        body: chirp.body,
        author_id: chirp.author_id,
    }
}

fn parse_chirp_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid chirp ID".into()))
}

pub async fn create_chirp(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(req): ApiJson<CreateChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = identity.require_user()?.id;

    if req.body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ApiError::Validation("Chirp is too long".into()));
    }

    let body = clean_body(&req.body);
    let chirp = run_db(&state, move |db| db.create_chirp(&body, author_id))
        .await?
        .map_err(|e| ApiError::internal("Couldn't create chirp", e))?;

    Ok((StatusCode::CREATED, Json(chirp_response(chirp))))
}

/// GET /api/chirps[?author_id=] — all chirps by id ascending, optionally one author's.
pub async fn list_chirps(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChirpQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let chirps = run_db(&state, |db| db.list_chirps())
        .await?
        .map_err(|e| ApiError::internal("Couldn't load chirps from database", e))?;

    let chirps: Vec<ChirpResponse> = chirps
        .into_iter()
        .filter(|chirp| query.author_id.is_none_or(|author| chirp.author_id == author))
        .map(chirp_response)
        .collect();

    Ok(Json(chirps))
}

pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_chirp_id(&chirp_id)?;

    let chirp = run_db(&state, move |db| db.get_chirp(id))
        .await?
        .map_err(not_found_or_internal)?;

    Ok(Json(chirp_response(chirp)))
}

/// DELETE /api/chirps/{id} — only the author may delete.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.require_user()?.id;
    let id = parse_chirp_id(&chirp_id)?;

    let chirp = run_db(&state, move |db| db.get_chirp(id))
        .await?
        .map_err(not_found_or_internal)?;
    if chirp.author_id != user_id {
        return Err(ApiError::Forbidden("You can only delete your own chirps".into()));
    }

    run_db(&state, move |db| db.delete_chirp(id))
        .await?
        .map_err(not_found_or_internal)?;

    info!("Chirp {} deleted by user {}", id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

fn not_found_or_internal(err: StoreError) -> ApiError {
    if err.is_missing() {
        ApiError::NotFound("Chirp with that ID doesn't exist".into())
    } else {
        ApiError::internal("chirp lookup failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_body_replaces_banned_words() {
        let cases = [
            (
                "This is a kerfuffle opinion I need to share with the world",
                "This is a **** opinion I need to share with the world",
            ),
            (
                "Get this sharbert thing outta my face",
                "Get this **** thing outta my face",
            ),
            (
                "That's some really interesting fornax you got there",
                "That's some really interesting **** you got there",
            ),
            (
                "Fornax is some prime reading material",
                "**** is some prime reading material",
            ),
            ("KERFUFFLE", "****"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_body(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn attached_punctuation_blocks_the_match() {
        assert_eq!(clean_body("Sharbert! My bad man"), "Sharbert! My bad man");
    }

    #[test]
    fn clean_body_collapses_whitespace() {
        assert_eq!(clean_body("  hello \t  world  "), "hello world");
    }

    #[test]
    fn chirp_ids_must_be_integers() {
        assert_eq!(parse_chirp_id("12").unwrap(), 12);
        assert!(matches!(parse_chirp_id("abc"), Err(ApiError::Validation(_))));
        assert!(matches!(parse_chirp_id("-1"), Err(ApiError::Validation(_))));
    }
}
