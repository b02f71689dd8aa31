use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Contents of `metadata.json` inside an archive bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub archive_name: String,
    pub archived_date: DateTime<Utc>,
    pub regions_archived: usize,
    /// Region code to base64 SHA-256 of the archived document bytes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checksums: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonIndex {
    pub seasons: Vec<String>,
    pub last_updated: DateTime<Utc>,
}
