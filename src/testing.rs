//! Scripted collaborators for tests.

use crate::error::AppError;
use crate::models::archive::{ArchiveManifest, SeasonIndex};
use crate::models::league::{LeagueList, RiotId};
use crate::services::riot::LeaderboardSource;
use crate::store::{DocumentStore, SqliteStore};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn entry(puuid: &str, league_points: u32) -> Value {
    json!({
        "summonerId": format!("sid-{puuid}"),
        "puuid": puuid,
        "leaguePoints": league_points,
        "rank": "I",
        "wins": 120,
        "losses": 90,
        "veteran": false,
        "inactive": false,
    })
}

pub fn ladder(puuids: &[&str]) -> Vec<Value> {
    puuids
        .iter()
        .enumerate()
        .map(|(i, p)| entry(p, 2000 - i as u32))
        .collect()
}

/// Platforms without a scripted ladder answer 503.
#[derive(Default)]
pub struct FakeSource {
    leagues: Mutex<HashMap<String, Result<Vec<Value>, u16>>>,
    accounts: HashMap<String, RiotId>,
    failing_accounts: HashSet<String>,
    league_calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_league(self, platform: &str, entries: Vec<Value>) -> Self {
        self.set_league(platform, entries);
        self
    }

    pub fn with_failure(self, platform: &str, status: u16) -> Self {
        self.leagues
            .lock()
            .unwrap()
            .insert(platform.to_string(), Err(status));
        self
    }

    pub fn with_account(mut self, puuid: &str, name: &str, tag: &str) -> Self {
        self.accounts.insert(
            puuid.to_string(),
            RiotId {
                game_name: name.into(),
                tag_line: tag.into(),
            },
        );
        self
    }

    pub fn with_failing_account(mut self, puuid: &str) -> Self {
        self.failing_accounts.insert(puuid.to_string());
        self
    }

    pub fn set_league(&self, platform: &str, entries: Vec<Value>) {
        self.leagues
            .lock()
            .unwrap()
            .insert(platform.to_string(), Ok(entries));
    }

    pub fn league_calls(&self) -> Vec<String> {
        self.league_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeaderboardSource for FakeSource {
    async fn challenger_league(&self, platform: &str) -> Result<LeagueList, AppError> {
        self.league_calls.lock().unwrap().push(platform.to_string());
        match self.leagues.lock().unwrap().get(platform) {
            Some(Ok(entries)) => Ok(LeagueList {
                entries: entries.clone(),
            }),
            Some(Err(status)) => Err(AppError::Upstream {
                status: *status,
                url: format!("fake://{platform}"),
            }),
            None => Err(AppError::Upstream {
                status: 503,
                url: format!("fake://{platform}"),
            }),
        }
    }

    async fn account(&self, puuid: &str, _routing: &str) -> Result<RiotId, AppError> {
        if self.failing_accounts.contains(puuid) {
            return Err(AppError::Upstream {
                status: 429,
                url: format!("fake://account/{puuid}"),
            });
        }
        Ok(self.accounts.get(puuid).cloned().unwrap_or_else(|| RiotId {
            game_name: format!("Player {puuid}"),
            tag_line: "TST".into(),
        }))
    }
}

/// In-memory store that refuses to archive the listed regions.
pub struct FailingArchiveStore {
    inner: SqliteStore,
    failing: HashSet<String>,
}

impl FailingArchiveStore {
    pub fn new(failing: &[&str]) -> Self {
        FailingArchiveStore {
            inner: SqliteStore::open_in_memory().unwrap(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DocumentStore for FailingArchiveStore {
    fn load_region_raw(&self, code: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.inner.load_region_raw(code)
    }

    fn save_region_raw(&self, code: &str, body: &[u8]) -> Result<(), AppError> {
        self.inner.save_region_raw(code, body)
    }

    fn clear_region(&self, code: &str) -> Result<(), AppError> {
        self.inner.clear_region(code)
    }

    fn archive_names(&self) -> Result<Vec<String>, AppError> {
        self.inner.archive_names()
    }

    fn put_archive_document(
        &self,
        archive: &str,
        code: &str,
        body: &[u8],
    ) -> Result<(), AppError> {
        if self.failing.contains(code) {
            return Err(AppError::Internal(format!("disk full writing {code}")));
        }
        self.inner.put_archive_document(archive, code, body)
    }

    fn load_archive_document(
        &self,
        archive: &str,
        code: &str,
    ) -> Result<Option<Vec<u8>>, AppError> {
        self.inner.load_archive_document(archive, code)
    }

    fn put_manifest(&self, manifest: &ArchiveManifest) -> Result<(), AppError> {
        self.inner.put_manifest(manifest)
    }

    fn load_manifest(&self, archive: &str) -> Result<Option<ArchiveManifest>, AppError> {
        self.inner.load_manifest(archive)
    }

    fn put_season_index(&self, index: &SeasonIndex) -> Result<(), AppError> {
        self.inner.put_season_index(index)
    }

    fn load_season_index(&self) -> Result<Option<SeasonIndex>, AppError> {
        self.inner.load_season_index()
    }
}
