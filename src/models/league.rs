use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Challenger league payload. Entries stay raw so each one can be validated
/// on its own and a single bad entry never sinks the whole snapshot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeagueList {
    #[serde(default)]
    pub entries: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    pub puuid: String,
    pub league_points: u32,
    pub wins: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiotId {
    pub game_name: String,
    pub tag_line: String,
}

impl RiotId {
    pub fn unknown() -> Self {
        RiotId {
            game_name: "Unknown".into(),
            tag_line: "0000".into(),
        }
    }
}

/// A validated, enriched leaderboard entry with its 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: u32,
    pub entry: LeagueEntry,
    pub riot_id: RiotId,
}

/// One day's leaderboard after validation and enrichment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<RankedEntry>,
    /// Entries the upstream reported, malformed ones included. Drives the
    /// visibility rule.
    pub total_entries: usize,
}
