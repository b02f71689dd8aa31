use super::DocumentStore;
use crate::error::AppError;
use crate::models::archive::{ArchiveManifest, SeasonIndex};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const ARCHIVES_DIR: &str = "archives";
const MANIFEST_FILE: &str = "metadata.json";
const SEASONS_FILE: &str = "seasons.json";

/// Directory layout:
///
/// ```text
/// <root>/<code>_players.json
/// <root>/archives/<name>/<code>_players.json
/// <root>/archives/<name>/metadata.json
/// <root>/archives/seasons.json
/// ```
pub struct FsStore {
    root: PathBuf,
}

fn document_file(code: &str) -> String {
    format!("{}_players.json", code)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, AppError> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes through a sibling temp file and renames it into place.
fn write_replace(path: &Path, body: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(body)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_new(path: &Path, body: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(body)?;
    file.sync_all()?;
    Ok(())
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    fn live_path(&self, code: &str) -> PathBuf {
        self.root.join(document_file(code))
    }

    fn archives_dir(&self) -> PathBuf {
        self.root.join(ARCHIVES_DIR)
    }

    fn archive_dir(&self, archive: &str) -> PathBuf {
        self.archives_dir().join(archive)
    }
}

impl DocumentStore for FsStore {
    fn load_region_raw(&self, code: &str) -> Result<Option<Vec<u8>>, AppError> {
        read_optional(&self.live_path(code))
    }

    fn save_region_raw(&self, code: &str, body: &[u8]) -> Result<(), AppError> {
        write_replace(&self.live_path(code), body)
    }

    fn clear_region(&self, code: &str) -> Result<(), AppError> {
        match fs::remove_file(self.live_path(code)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn archive_names(&self) -> Result<Vec<String>, AppError> {
        let entries = match fs::read_dir(self.archives_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn put_archive_document(
        &self,
        archive: &str,
        code: &str,
        body: &[u8],
    ) -> Result<(), AppError> {
        write_new(&self.archive_dir(archive).join(document_file(code)), body)
    }

    fn load_archive_document(
        &self,
        archive: &str,
        code: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        read_optional(&self.archive_dir(archive).join(document_file(code)))
    }

    fn put_manifest(&self, manifest: &ArchiveManifest) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(manifest)?;
        write_new(
            &self.archive_dir(&manifest.archive_name).join(MANIFEST_FILE),
            &body,
        )
    }

    fn load_manifest(&self, archive: &str) -> Result<Option<ArchiveManifest>, AppError> {
        match read_optional(&self.archive_dir(archive).join(MANIFEST_FILE))? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn put_season_index(&self, index: &SeasonIndex) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(index)?;
        write_replace(&self.archives_dir().join(SEASONS_FILE), &body)
    }

    fn load_season_index(&self) -> Result<Option<SeasonIndex>, AppError> {
        match read_optional(&self.archives_dir().join(SEASONS_FILE))? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }
}
