use crate::config::RoutingTable;
use crate::error::AppError;
use crate::models::archive::ArchiveManifest;
use crate::models::dashboard::{RegionSummary, SeasonList};
use crate::models::player::RegionHistory;
use crate::store::DocumentStore;
use crate::validation;

pub fn list_regions(routing: &RoutingTable) -> Vec<RegionSummary> {
    routing
        .regions()
        .map(|(group, region)| RegionSummary {
            code: region.code.clone(),
            name: region.name.clone(),
            group: group.routing.clone(),
            capacity: region.capacity,
            threshold: region.visibility_threshold(),
        })
        .collect()
}

/// Live document bytes as stored. A configured region that has not been
/// reconciled yet (or was just archived) reads as an empty history.
pub fn region_document(
    store: &dyn DocumentStore,
    routing: &RoutingTable,
    code: &str,
) -> Result<Vec<u8>, AppError> {
    validation::validate_region_code(code)?;
    let (_, region) = routing
        .find(code)
        .ok_or_else(|| AppError::NotFound(format!("Unknown region: {}", code)))?;
    match store.load_region_raw(code)? {
        Some(raw) => Ok(raw),
        None => Ok(serde_json::to_vec_pretty(&RegionHistory::empty(
            &region.code,
            &region.name,
        ))?),
    }
}

pub fn seasons(store: &dyn DocumentStore) -> Result<SeasonList, AppError> {
    Ok(match store.load_season_index()? {
        Some(index) => SeasonList {
            seasons: index.seasons,
            last_updated: Some(index.last_updated.to_rfc3339()),
        },
        None => SeasonList {
            seasons: Vec::new(),
            last_updated: None,
        },
    })
}

pub fn manifest(store: &dyn DocumentStore, archive: &str) -> Result<ArchiveManifest, AppError> {
    validation::validate_archive_name(archive)?;
    store
        .load_manifest(archive)?
        .ok_or_else(|| AppError::NotFound(format!("Archive not found: {}", archive)))
}

pub fn archived_document(
    store: &dyn DocumentStore,
    archive: &str,
    code: &str,
) -> Result<Vec<u8>, AppError> {
    validation::validate_archive_name(archive)?;
    validation::validate_region_code(code)?;
    store.load_archive_document(archive, code)?.ok_or_else(|| {
        AppError::NotFound(format!("No archived document for {} in {}", code, archive))
    })
}
