//! Persisted record types. These are the on-disk shapes; API payloads live
//! in chirpy-types so the store stays independent of the wire format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chirp {
    pub id: u64,
    pub body: String,
    pub author_id: u64,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub is_privileged: bool,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("is_privileged", &self.is_privileged)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: u64,
    pub plaintext: String,
    pub expiry: DateTime<Utc>,
    pub user_id: u64,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("id", &self.id)
            .field("plaintext", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Highest id ever issued per collection. Survives deletion of the top row,
/// so ids are never handed out twice.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(default)]
    pub chirps: u64,
    #[serde(default)]
    pub users: u64,
    #[serde(default)]
    pub tokens: u64,
}

/// The root of the persisted JSON file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chirps: BTreeMap<u64, Chirp>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: BTreeMap<u64, User>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tokens: BTreeMap<u64, RefreshToken>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl Document {
    pub fn next_chirp_id(&mut self) -> Result<u64> {
        next_id(&self.chirps, &mut self.sequences.chirps)
    }

    pub fn next_user_id(&mut self) -> Result<u64> {
        next_id(&self.users, &mut self.sequences.users)
    }

    pub fn next_token_id(&mut self) -> Result<u64> {
        next_id(&self.tokens, &mut self.sequences.tokens)
    }
}

fn next_id<V>(rows: &BTreeMap<u64, V>, issued: &mut u64) -> Result<u64> {
    let highest = rows.keys().next_back().copied().unwrap_or(0).max(*issued);
    *issued = highest
        .checked_add(1)
        .ok_or_else(|| StoreError::Corruption(format!("id space exhausted after {}", highest)))?;
    Ok(*issued)
}

// Files written by older builds store empty collections as `null`.
fn null_as_empty<'de, D, V>(deserializer: D) -> std::result::Result<BTreeMap<u64, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(Option::<BTreeMap<u64, V>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chirp(id: u64) -> Chirp {
        Chirp {
            id,
            body: "x".into(),
            author_id: 1,
        }
    }

    #[test]
    fn next_id_starts_at_one_and_skips_deleted_top() {
        let mut doc = Document::default();
        assert_eq!(doc.next_chirp_id().unwrap(), 1);
        assert_eq!(doc.next_chirp_id().unwrap(), 2);

        // Rows inserted by hand still push the counter forward.
        doc.chirps.insert(7, chirp(7));
        assert_eq!(doc.next_chirp_id().unwrap(), 8);

        doc.chirps.clear();
        assert_eq!(doc.next_chirp_id().unwrap(), 9);
    }

    #[test]
    fn exhausted_id_space_is_corruption() {
        let mut doc = Document::default();
        doc.chirps.insert(u64::MAX, chirp(u64::MAX));
        assert!(matches!(doc.next_chirp_id(), Err(StoreError::Corruption(_))));

        let mut doc = Document::default();
        doc.sequences.users = u64::MAX;
        assert!(matches!(doc.next_user_id(), Err(StoreError::Corruption(_))));
    }

    #[test]
    fn collections_have_independent_counters() {
        let mut doc = Document::default();
        assert_eq!(doc.next_chirp_id().unwrap(), 1);
        assert_eq!(doc.next_user_id().unwrap(), 1);
        assert_eq!(doc.next_token_id().unwrap(), 1);
    }

    #[test]
    fn null_collections_deserialize_as_empty() {
        let doc: Document =
            serde_json::from_str(r#"{"chirps":null,"users":null}"#).unwrap();
        assert!(doc.chirps.is_empty());
        assert!(doc.users.is_empty());
        assert!(doc.tokens.is_empty());
        assert_eq!(doc.sequences, Sequences::default());
    }

    #[test]
    fn ids_serialize_as_decimal_string_keys() {
        let mut doc = Document::default();
        doc.users.insert(
            3,
            User {
                id: 3,
                email: "a@b.c".into(),
                password_hash: "h".into(),
                is_privileged: false,
            },
        );
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["users"]["3"]["email"], "a@b.c");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let user = User {
            id: 1,
            email: "a@b.c".into(),
            password_hash: "$argon2id$secret".into(),
            is_privileged: false,
        };
        assert!(!format!("{:?}", user).contains("secret"));
    }
}
