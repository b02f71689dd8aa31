use super::DocumentStore;
use crate::db::Db;
use crate::error::AppError;
use crate::models::archive::{ArchiveManifest, SeasonIndex};
use rusqlite::{params, OptionalExtension};

/// Stores documents as BLOBs so archived bytes match live bytes exactly.
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub fn new(db: Db) -> Self {
        SqliteStore { db }
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Ok(SqliteStore::new(Db::open_in_memory()?))
    }
}

impl DocumentStore for SqliteStore {
    fn load_region_raw(&self, code: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT body FROM region_documents WHERE region_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn save_region_raw(&self, code: &str, body: &[u8]) -> Result<(), AppError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO region_documents (region_code, body, updated_at)
                 VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(region_code) DO UPDATE SET
                    body = excluded.body, updated_at = excluded.updated_at",
                params![code, body],
            )?;
            Ok(())
        })
    }

    fn clear_region(&self, code: &str) -> Result<(), AppError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM region_documents WHERE region_code = ?1",
                params![code],
            )?;
            Ok(())
        })
    }

    fn archive_names(&self) -> Result<Vec<String>, AppError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT archive_name FROM archive_manifests
                 UNION
                 SELECT DISTINCT archive_name FROM archive_documents",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut names = Vec::new();
            for row in rows {
                names.push(row?);
            }
            Ok(names)
        })
    }

    fn put_archive_document(
        &self,
        archive: &str,
        code: &str,
        body: &[u8],
    ) -> Result<(), AppError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO archive_documents (archive_name, region_code, body)
                 VALUES (?1, ?2, ?3)",
                params![archive, code, body],
            )?;
            Ok(())
        })
    }

    fn load_archive_document(
        &self,
        archive: &str,
        code: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT body FROM archive_documents
                 WHERE archive_name = ?1 AND region_code = ?2",
                params![archive, code],
                |row| row.get(0),
            )
            .optional()
        })
    }

    fn put_manifest(&self, manifest: &ArchiveManifest) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(manifest)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO archive_manifests (archive_name, body) VALUES (?1, ?2)",
                params![manifest.archive_name, body],
            )?;
            Ok(())
        })
    }

    fn load_manifest(&self, archive: &str) -> Result<Option<ArchiveManifest>, AppError> {
        let raw: Option<Vec<u8>> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT body FROM archive_manifests WHERE archive_name = ?1",
                params![archive],
                |row| row.get(0),
            )
            .optional()
        })?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn put_season_index(&self, index: &SeasonIndex) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(index)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO season_index (id, body) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET body = excluded.body",
                params![body],
            )?;
            Ok(())
        })
    }

    fn load_season_index(&self) -> Result<Option<SeasonIndex>, AppError> {
        let raw: Option<Vec<u8>> = self.db.with_conn(|conn| {
            conn.query_row("SELECT body FROM season_index WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
        })?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }
}
