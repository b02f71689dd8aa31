use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's longitudinal record within a region. Field names are read
/// verbatim by dashboards and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub puuid: String,
    pub summoner_name: String,
    pub tag_line: String,
    pub league_points: Option<u32>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub first_seen_date: DateTime<Utc>,
    /// Tenure: days actively ranked. Always equals `rank_history.len()`.
    #[serde(default)]
    pub days_in_challenger: u32,
    #[serde(default)]
    pub current_streak: u32,
    pub current_rank: Option<u32>,
    /// Public mean, only published when the day's sample was large enough.
    pub avg_rank: Option<f64>,
    #[serde(default)]
    pub avg_rank_all: f64,
    #[serde(default)]
    pub rank_history: Vec<u32>,
    #[serde(default)]
    pub is_active: bool,
    /// Overall position when all records are ordered by tenure.
    #[serde(default)]
    pub rank: u32,
}

pub fn mean_rank(history: &[u32]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    history.iter().map(|&r| f64::from(r)).sum::<f64>() / history.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionHistory {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_code: String,
    #[serde(default)]
    pub players: Vec<PlayerRecord>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl RegionHistory {
    pub fn empty(code: &str, name: &str) -> Self {
        RegionHistory {
            region: name.to_string(),
            region_code: code.to_string(),
            players: Vec::new(),
            last_update: None,
        }
    }

    pub fn has_active_players(&self) -> bool {
        self.players.iter().any(|p| p.is_active)
    }

    pub fn player(&self, puuid: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.puuid == puuid)
    }
}
