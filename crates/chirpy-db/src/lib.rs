pub mod chirps;
pub mod error;
pub mod models;
pub mod tokens;
pub mod users;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

pub use error::{Entity, Result, StoreError};
pub use models::{Chirp, Document, RefreshToken, User};
pub use tokens::TokenValidity;

/// Single-file JSON document store.
///
/// Chirps, users and refresh tokens all live in one file behind one
/// reader/writer lock. Nothing is cached between calls: every operation
/// re-reads the file and every mutation rewrites it in full. The rewrite is
/// a plain overwrite, so a crash mid-write can truncate the file.
pub struct Database {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Database {
    /// Open the store, creating an empty backing file if none exists.
    pub fn open(path: &Path) -> Result<Self> {
        match fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::write(path, b"").map_err(|e| {
                    StoreError::Corruption(format!("could not create {}: {}", path.display(), e))
                })?;
                info!("Created empty document store at {}", path.display());
            }
            Err(e) => {
                return Err(StoreError::Corruption(format!(
                    "could not stat {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        info!("Document store opened at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document under the shared lock.
    pub fn load(&self) -> Result<Document> {
        let _guard = self.lock.read().map_err(|_| StoreError::LockPoisoned)?;
        self.read_document()
    }

    /// Load, apply `f`, and write the document back, all under the exclusive
    /// lock. Nothing is written if `f` fails.
    pub fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.lock.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut doc = self.read_document()?;
        let out = f(&mut doc)?;
        self.write_document(&doc)?;
        Ok(out)
    }

    fn read_document(&self) -> Result<Document> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::default()),
            Err(e) => {
                return Err(StoreError::Corruption(format!(
                    "error reading {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        // An empty file is a fresh store, not a broken one.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::default());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Corruption(format!("error parsing {}: {}", self.path.display(), e))
        })
    }

    fn write_document(&self, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(doc)
            .map_err(|e| StoreError::Corruption(format!("error serializing document: {}", e)))?;

        fs::write(&self.path, &bytes).map_err(|e| {
            StoreError::Corruption(format!("error writing {}: {}", self.path.display(), e))
        })?;

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}
