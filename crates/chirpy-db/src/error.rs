use std::fmt;

use thiserror::Error;

/// Collections held by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Chirp,
    User,
    RefreshToken,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chirp => f.write_str("chirp"),
            Self::User => f.write_str("user"),
            Self::RefreshToken => f.write_str("refresh token"),
        }
    }
}

/// Errors returned by the store and its repositories. Raw I/O and JSON
/// failures never leak out; they surface as `Corruption`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup by primary id found nothing.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: Entity, id: u64 },

    /// Lookup by a secondary key (email, plaintext, owner) found nothing.
    #[error("{0} does not exist")]
    NotExist(Entity),

    /// A refresh-token plaintext failed the format check and was never looked up.
    #[error("invalid refresh token: {0}")]
    InvalidToken(String),

    #[error("document store unreadable: {0}")]
    Corruption(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("document store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn not_found(entity: Entity, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// True for the two "nothing matched" variants.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::NotExist(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
