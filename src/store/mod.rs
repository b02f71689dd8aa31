//! Keyed document persistence for live region histories and archives.
//!
//! Backends deal in raw bytes so archive copies can be byte-identical to
//! the live document they were taken from.

mod fs;
mod sqlite;

pub use fs::FsStore;
pub use sqlite::SqliteStore;

use crate::error::AppError;
use crate::models::archive::{ArchiveManifest, SeasonIndex};
use crate::models::player::RegionHistory;
use std::sync::Arc;

pub type SharedStore = Arc<dyn DocumentStore>;

pub trait DocumentStore: Send + Sync {
    fn load_region_raw(&self, code: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Replaces the live document for `code` in one step.
    fn save_region_raw(&self, code: &str, body: &[u8]) -> Result<(), AppError>;

    /// Removes the live document; the next load sees no history.
    fn clear_region(&self, code: &str) -> Result<(), AppError>;

    fn archive_names(&self) -> Result<Vec<String>, AppError>;

    /// Fails if the archive already holds a document for `code`.
    fn put_archive_document(&self, archive: &str, code: &str, body: &[u8])
        -> Result<(), AppError>;

    fn load_archive_document(&self, archive: &str, code: &str)
        -> Result<Option<Vec<u8>>, AppError>;

    fn put_manifest(&self, manifest: &ArchiveManifest) -> Result<(), AppError>;

    fn load_manifest(&self, archive: &str) -> Result<Option<ArchiveManifest>, AppError>;

    fn put_season_index(&self, index: &SeasonIndex) -> Result<(), AppError>;

    fn load_season_index(&self) -> Result<Option<SeasonIndex>, AppError>;

    fn load_region(&self, code: &str) -> Result<Option<RegionHistory>, AppError> {
        match self.load_region_raw(code)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_region(&self, code: &str, history: &RegionHistory) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(history)?;
        self.save_region_raw(code, &body)
    }
}
