use tracing::debug;

use crate::error::{Entity, Result, StoreError};
use crate::models::Chirp;
use crate::Database;

impl Database {
    /// Store a new chirp under the next free id. Length and content checks
    /// belong to the caller.
    pub fn create_chirp(&self, body: &str, author_id: u64) -> Result<Chirp> {
        let chirp = self.mutate(|doc| {
            let id = doc.next_chirp_id()?;
            let chirp = Chirp {
                id,
                body: body.to_string(),
                author_id,
            };
            doc.chirps.insert(id, chirp.clone());
            Ok(chirp)
        })?;

        debug!("Chirp {} created by user {}", chirp.id, chirp.author_id);
        Ok(chirp)
    }

    /// All chirps, ordered by id ascending.
    pub fn list_chirps(&self) -> Result<Vec<Chirp>> {
        Ok(self.load()?.chirps.into_values().collect())
    }

    pub fn get_chirp(&self, id: u64) -> Result<Chirp> {
        self.load()?
            .chirps
            .remove(&id)
            .ok_or(StoreError::not_found(Entity::Chirp, id))
    }

    pub fn delete_chirp(&self, id: u64) -> Result<()> {
        self.mutate(|doc| {
            doc.chirps
                .remove(&id)
                .map(|_| ())
                .ok_or(StoreError::not_found(Entity::Chirp, id))
        })?;

        debug!("Chirp {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::test_support::temp_db;

    #[test]
    fn create_then_get_returns_identical_record() {
        let (_dir, db) = temp_db();
        let created = db.create_chirp("The first chirp", 1).unwrap();
        let fetched = db.get_chirp(created.id).unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.body, "The first chirp");
        assert_eq!(fetched.author_id, 1);
    }

    #[test]
    fn sequential_creates_get_ids_one_to_n() {
        let (_dir, db) = temp_db();
        let ids: Vec<u64> = (0..5)
            .map(|i| db.create_chirp(&format!("chirp {}", i), 1).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn list_is_sorted_by_id() {
        let (_dir, db) = temp_db();
        for author in [3, 1, 2] {
            db.create_chirp("hi", author).unwrap();
        }
        let ids: Vec<u64> = db.list_chirps().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn list_on_empty_store_is_empty() {
        let (_dir, db) = temp_db();
        assert!(db.list_chirps().unwrap().is_empty());
    }

    #[test]
    fn missing_chirp_is_not_found() {
        let (_dir, db) = temp_db();
        assert!(matches!(db.get_chirp(42), Err(StoreError::NotFound { id: 42, .. })));
        assert!(matches!(db.delete_chirp(42), Err(StoreError::NotFound { id: 42, .. })));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let (_dir, db) = temp_db();
        db.create_chirp("one", 1).unwrap();
        let two = db.create_chirp("two", 1).unwrap();
        db.delete_chirp(two.id).unwrap();

        assert!(db.get_chirp(two.id).unwrap_err().is_missing());
        assert_eq!(db.create_chirp("three", 1).unwrap().id, 3);
    }

    #[test]
    fn concurrent_creates_yield_distinct_ids() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);
        let writers = 16;

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let db = db.clone();
                thread::spawn(move || db.create_chirp(&format!("chirp {}", i), i).unwrap().id)
            })
            .collect();

        let ids: HashSet<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), writers as usize);
        assert_eq!(ids, (1..=writers).collect());
        assert_eq!(db.list_chirps().unwrap().len(), writers as usize);
    }
}
