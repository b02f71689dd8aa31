//! Season rollover: copy every live region document into a dated archive,
//! then clear live history.

use crate::config::RoutingTable;
use crate::error::AppError;
use crate::models::archive::{ArchiveManifest, SeasonIndex};
use crate::store::DocumentStore;
use crate::validation;
use base64::Engine;
use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRegionOutcome {
    Archived,
    /// No live document existed; nothing to copy or clear.
    Missing,
    /// The copy did not happen or could not be verified. Live history is
    /// kept.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub manifest: ArchiveManifest,
    pub outcomes: Vec<(String, ArchiveRegionOutcome)>,
    pub cleared: Vec<String>,
}

impl ArchiveReport {
    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(code, outcome)| match outcome {
            ArchiveRegionOutcome::Failed(_) => Some(code.as_str()),
            _ => None,
        })
    }
}

/// `<year>_<n>` with `n` one past the highest sequence already used this
/// year. Depends only on `existing`.
pub fn next_archive_name(existing: &[String], year: i32) -> String {
    let next = existing
        .iter()
        .filter_map(|name| validation::parse_archive_name(name))
        .filter(|(y, _)| *y == year)
        .map(|(_, seq)| seq)
        .max()
        .map_or(1, |seq| seq + 1);
    format!("{}_{}", year, next)
}

/// Most recent first, ordered by year then sequence so `2025_10` sorts
/// above `2025_9`.
pub fn build_season_index(names: Vec<String>, now: DateTime<Utc>) -> SeasonIndex {
    let mut seasons: Vec<String> = names.into_iter().filter(|n| n.contains('_')).collect();
    seasons.sort_by(|a, b| {
        let key_a = (validation::parse_archive_name(a), a);
        let key_b = (validation::parse_archive_name(b), b);
        key_b.cmp(&key_a)
    });
    SeasonIndex {
        seasons,
        last_updated: now,
    }
}

pub fn checksum(body: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(body))
}

fn archive_region(
    store: &dyn DocumentStore,
    archive: &str,
    code: &str,
) -> Result<Option<String>, AppError> {
    let Some(body) = store.load_region_raw(code)? else {
        return Ok(None);
    };
    let digest = checksum(&body);
    store.put_archive_document(archive, code, &body)?;
    match store.load_archive_document(archive, code)? {
        Some(copied) if checksum(&copied) == digest => Ok(Some(digest)),
        _ => Err(AppError::Internal(format!(
            "archived copy of {} does not match live document",
            code
        ))),
    }
}

pub fn regenerate_season_index(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
) -> Result<SeasonIndex, AppError> {
    let index = build_season_index(store.archive_names()?, now);
    store.put_season_index(&index)?;
    info!(seasons = index.seasons.len(), "season index regenerated");
    Ok(index)
}

/// Archives every region in `routing`. A region that fails to archive is
/// reported and keeps its live history; the rest proceed. Errors are
/// returned only when the bundle itself cannot be recorded, in which case
/// nothing has been cleared.
pub fn archive_all(
    store: &dyn DocumentStore,
    routing: &RoutingTable,
    now: DateTime<Utc>,
) -> Result<ArchiveReport, AppError> {
    let archive_name = next_archive_name(&store.archive_names()?, now.year());
    info!(archive = %archive_name, "archiving season");

    let mut outcomes = Vec::new();
    let mut checksums = BTreeMap::new();
    for (_, region) in routing.regions() {
        let outcome = match archive_region(store, &archive_name, &region.code) {
            Ok(Some(digest)) => {
                info!(region = %region.code, "archived");
                checksums.insert(region.code.clone(), digest);
                ArchiveRegionOutcome::Archived
            }
            Ok(None) => ArchiveRegionOutcome::Missing,
            Err(e) => {
                error!(region = %region.code, error = %e, "archive failed, keeping live history");
                ArchiveRegionOutcome::Failed(e.to_string())
            }
        };
        outcomes.push((region.code.clone(), outcome));
    }

    let manifest = ArchiveManifest {
        archive_name: archive_name.clone(),
        archived_date: now,
        regions_archived: checksums.len(),
        checksums,
    };
    store.put_manifest(&manifest)?;
    info!(archive = %archive_name, regions = manifest.regions_archived, "archive written");

    let mut cleared = Vec::new();
    for (code, outcome) in &outcomes {
        if *outcome != ArchiveRegionOutcome::Archived {
            continue;
        }
        match store.clear_region(code) {
            Ok(()) => cleared.push(code.clone()),
            Err(e) => warn!(region = %code, error = %e, "could not clear live history"),
        }
    }
    info!(cleared = cleared.len(), "live history cleared for new season");

    regenerate_season_index(store, now)?;

    Ok(ArchiveReport {
        manifest,
        outcomes,
        cleared,
    })
}
