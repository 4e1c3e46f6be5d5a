use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{debug, info};

use crate::error::{Entity, Result, StoreError};
use crate::models::User;
use crate::Database;

// Fixed Argon2id cost. Changing these only affects newly written hashes;
// verification reads the parameters embedded in each stored hash.
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_LANES: u32 = 1;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_LANES, None)
        .map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Salt and hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Check a password against a stored hash. A malformed hash is an error,
/// a mismatch is `Ok(false)`.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(hasher()?.verify_password(password.as_bytes(), &parsed).is_ok())
}

impl Database {
    /// Insert a new user. Email uniqueness is not checked here: callers run
    /// `email_exists` first, under a separate lock acquisition.
    pub fn create_user(&self, email: &str, password: &str) -> Result<User> {
        // Hash outside the write lock; Argon2 is deliberately slow.
        let password_hash = hash_password(password)?;

        let user = self.mutate(|doc| {
            let id = doc.next_user_id()?;
            let user = User {
                id,
                email: email.to_string(),
                password_hash,
                is_privileged: false,
            };
            doc.users.insert(id, user.clone());
            Ok(user)
        })?;

        info!("User {} created", user.id);
        Ok(user)
    }

    /// Replace a user's email and password, keeping the privilege flag.
    pub fn update_user(&self, id: u64, email: &str, password: &str) -> Result<User> {
        let password_hash = hash_password(password)?;

        let user = self.mutate(|doc| {
            let user = doc
                .users
                .get_mut(&id)
                .ok_or(StoreError::NotExist(Entity::User))?;
            user.email = email.to_string();
            user.password_hash = password_hash;
            Ok(user.clone())
        })?;

        debug!("User {} updated", id);
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.load()?
            .users
            .into_values()
            .find(|user| user.email == email)
            .ok_or(StoreError::NotExist(Entity::User))
    }

    pub fn get_user_by_id(&self, id: u64) -> Result<User> {
        self.load()?
            .users
            .remove(&id)
            .ok_or(StoreError::NotExist(Entity::User))
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        match self.get_user_by_email(email) {
            Ok(_) => Ok(true),
            Err(StoreError::NotExist(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn set_privileged(&self, id: u64) -> Result<()> {
        self.mutate(|doc| {
            let user = doc
                .users
                .get_mut(&id)
                .ok_or(StoreError::NotExist(Entity::User))?;
            user.is_privileged = true;
            Ok(())
        })?;

        info!("User {} upgraded to privileged", id);
        Ok(())
    }
}
