//! File-backed directive store.
//!
//! All directives live in one JSON document, `<store_dir>/merges.json`.
//!
//! - Writes go to a temp file in the same directory and are renamed into
//!   place, so readers see either the old or the new document, never a torn one
//! - Mutations hold [`StoreLock`] across read-validate-write
//! - A missing document is an empty store

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::directive::{check_new, MergeDirective};
use super::lock::StoreLock;
use super::store::{DirectiveStore, StoreError};
use crate::error::MergeError;

/// Schema version of merges.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier of merges.json
pub const SCHEMA_ID: &str = "catalog-merge/merges@1";

const DOCUMENT_FILENAME: &str = "merges.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    schema_id: String,
    directives: Vec<MergeDirective>,
}

impl StoreDocument {
    fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            directives: Vec::new(),
        }
    }
}

/// Directive store persisted as a JSON document on disk.
#[derive(Debug)]
pub struct FileStore {
    store_dir: PathBuf,
    lock_timeout: Duration,
    /// Serializes writers inside this process before they contend on the file lock.
    write_guard: Mutex<()>,
}

impl FileStore {
    /// Open (or create) a store rooted at `store_dir`.
    pub fn open(store_dir: impl AsRef<Path>, lock_timeout: Duration) -> Result<Self, StoreError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir)?;

        let store = Self {
            store_dir,
            lock_timeout,
            write_guard: Mutex::new(()),
        };
        // Surface a corrupt or foreign document at open time.
        store.read_document()?;
        Ok(store)
    }

    pub fn document_path(&self) -> PathBuf {
        self.store_dir.join(DOCUMENT_FILENAME)
    }

    fn read_document(&self) -> Result<StoreDocument, StoreError> {
        let path = self.document_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoreDocument::empty());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let doc: StoreDocument =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if doc.schema_version != SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema(doc.schema_version));
        }
        Ok(doc)
    }

    fn write_document(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let json =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let temp_name = format!(
            ".{}.tmp.{}.{}",
            DOCUMENT_FILENAME,
            std::process::id(),
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        );
        let temp_path = self.store_dir.join(temp_name);

        let written = (|| {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp_path, self.document_path())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    /// Run `f` on the document under both locks and persist the result.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<(T, bool), MergeError>,
    ) -> Result<T, MergeError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StoreError::Unavailable("file store guard poisoned".to_string()))?;
        let _lock = StoreLock::acquire(&self.store_dir, self.lock_timeout)?;

        let mut doc = self.read_document()?;
        let (value, changed) = f(&mut doc)?;
        if changed {
            self.write_document(&doc)?;
        }
        Ok(value)
    }
}

impl DirectiveStore for FileStore {
    fn load_all(&self) -> Result<Vec<MergeDirective>, StoreError> {
        Ok(self.read_document()?.directives)
    }

    fn insert_checked(&self, directive: MergeDirective) -> Result<MergeDirective, MergeError> {
        self.mutate(|doc| {
            check_new(
                &doc.directives,
                &directive.primary_handle,
                &directive.secondary_handle,
            )?;
            doc.directives.push(directive.clone());
            Ok((directive, true))
        })
    }

    fn remove(&self, id: &str) -> Result<Option<MergeDirective>, StoreError> {
        let removed = self.mutate(|doc| {
            let removed = doc
                .directives
                .iter()
                .position(|d| d.id == id)
                .map(|idx| doc.directives.remove(idx));
            let changed = removed.is_some();
            Ok((removed, changed))
        });

        match removed {
            Ok(removed) => Ok(removed),
            Err(MergeError::StoreUnavailable(e)) => Err(e),
            Err(other) => Err(StoreError::Unavailable(other.to_string())),
        }
    }
}
