//! Claims tokens: short-lived HS256 JWTs whose subject is the user id.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use chirpy_types::api::Claims;

pub const ISSUER: &str = "chirpy";

/// Upper bound and default lifetime of a claims token.
pub const DEFAULT_TTL_SECS: i64 = 60 * 60;

/// Header `typ` every claims token carries.
const TOKEN_TYPE: &str = "JWT";

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, expired, or a non-integer subject.
    #[error("invalid token")]
    Invalid,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// A bearer value after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Structurally a JWT; verify with [`TokenService::verify`].
    Claims(String),
    /// Anything else, treated as a refresh-token plaintext.
    Opaque(String),
}

/// Decide which kind of credential a bearer value is without a caller hint.
/// Structural mismatches never fail; they just mean "opaque".
pub fn classify(credential: &str) -> Credential {
    if looks_like_claims_token(credential) {
        Credential::Claims(credential.to_string())
    } else {
        Credential::Opaque(credential.to_string())
    }
}

fn looks_like_claims_token(token: &str) -> bool {
    if token.split('.').count() != 3 {
        return false;
    }
    // decode_header rejects undecodable segments and headers without a known `alg`.
    match jsonwebtoken::decode_header(token) {
        Ok(header) => header.typ.as_deref() == Some(TOKEN_TYPE),
        Err(_) => false,
    }
}

/// Issues and verifies claims tokens with the server secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            default_ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    /// Lifetime actually granted for a request. Shorter requests are honored,
    /// longer ones clamp to the default, non-positive ones fall back to it.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(ttl) if ttl > Duration::zero() => ttl.min(self.default_ttl),
            _ => self.default_ttl,
        }
    }

    pub fn issue(
        &self,
        user_id: u64,
        requested_ttl: Option<Duration>,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + self.effective_ttl(requested_ttl)).timestamp(),
            sub: user_id.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, issuer and expiry, then return the subject as a user id.
    pub fn verify(&self, token: &str) -> Result<u64, TokenError> {
        self.decode_claims(token)?
            .sub
            .parse()
            .map_err(|_| TokenError::Invalid)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}
