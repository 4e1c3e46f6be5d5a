use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use tracing::{debug, info};

use crate::error::{Entity, Result, StoreError};
use crate::models::RefreshToken;
use crate::Database;

/// Random bytes per refresh token (64 hex characters).
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Fixed refresh-token lifetime.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Outcome of a successful refresh-token lookup. Expiry is reported, not
/// enforced; the caller decides what an expired token means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValidity {
    Valid(RefreshToken),
    Expired(RefreshToken),
}

/// `n_bytes` of OS randomness, hex-encoded.
pub fn generate_token(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn check_token_format(plaintext: &str) -> Result<()> {
    let decoded = hex::decode(plaintext)
        .map_err(|e| StoreError::InvalidToken(format!("not hex: {}", e)))?;
    if decoded.len() != REFRESH_TOKEN_BYTES {
        return Err(StoreError::InvalidToken(format!(
            "expected {} bytes, got {}",
            REFRESH_TOKEN_BYTES,
            decoded.len()
        )));
    }
    Ok(())
}

impl Database {
    /// Issue a fresh refresh token for `user_id`. A user holds at most one
    /// row: an existing row keeps its id and gets a new plaintext and expiry,
    /// so the previous plaintext stops validating immediately.
    pub fn issue_refresh_token(&self, user_id: u64) -> Result<RefreshToken> {
        let plaintext = generate_token(REFRESH_TOKEN_BYTES);
        let expiry = Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS);

        let token = self.mutate(|doc| {
            let existing = doc
                .tokens
                .values()
                .find(|token| token.user_id == user_id)
                .map(|token| token.id);
            let id = match existing {
                Some(id) => id,
                None => doc.next_token_id()?,
            };

            let token = RefreshToken {
                id,
                plaintext,
                expiry,
                user_id,
            };
            doc.tokens.insert(id, token.clone());
            Ok(token)
        })?;

        debug!("Refresh token {} issued for user {}", token.id, user_id);
        Ok(token)
    }

    pub fn revoke_refresh_token(&self, id: u64) -> Result<()> {
        self.mutate(|doc| {
            doc.tokens
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::not_found(Entity::RefreshToken, id))
        })?;

        info!("Refresh token {} revoked", id);
        Ok(())
    }

    /// Look up a plaintext. Malformed plaintexts fail with `InvalidToken`
    /// before any lookup happens.
    pub fn validate_refresh_token(&self, plaintext: &str) -> Result<TokenValidity> {
        check_token_format(plaintext)?;

        let token = self.find_refresh_token(plaintext)?;
        if token.is_expired(Utc::now()) {
            Ok(TokenValidity::Expired(token))
        } else {
            Ok(TokenValidity::Valid(token))
        }
    }

    /// Id of the user a plaintext was issued to.
    pub fn user_for_refresh_token(&self, plaintext: &str) -> Result<u64> {
        check_token_format(plaintext)?;
        Ok(self.find_refresh_token(plaintext)?.user_id)
    }

    fn find_refresh_token(&self, plaintext: &str) -> Result<RefreshToken> {
        self.load()?
            .tokens
            .into_values()
            .find(|token| token.plaintext == plaintext)
            .ok_or(StoreError::NotExist(Entity::RefreshToken))
    }
}
