//! Merges one day's leaderboard into a region's persisted history.

use crate::models::league::{LeagueEntry, RankedEntry, Snapshot};
use crate::models::player::{mean_rank, PlayerRecord, RegionHistory};
use crate::validation;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// Result of validating one raw leaderboard entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Accepted { rank: u32, entry: LeagueEntry },
    Skipped { rank: u32, reason: String },
}

/// Validates raw entries in ladder order. Ranks are positions in the raw
/// list, so a skipped entry still occupies its rank.
pub fn classify_entries(raw: &[Value]) -> Vec<EntryOutcome> {
    raw.iter()
        .enumerate()
        .map(|(idx, value)| {
            let rank = idx as u32 + 1;
            match validation::validate_league_entry(value) {
                Ok(entry) => EntryOutcome::Accepted { rank, entry },
                Err(e) => EntryOutcome::Skipped {
                    rank,
                    reason: e.to_string(),
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub new_players: usize,
    pub continuing: usize,
    pub returning: usize,
    pub dropped: usize,
    /// Earlier occurrences of a repeated puuid, superseded by the later one.
    pub duplicates: usize,
}

fn new_record(ranked: &RankedEntry, now: DateTime<Utc>) -> PlayerRecord {
    PlayerRecord {
        puuid: ranked.entry.puuid.clone(),
        summoner_name: ranked.riot_id.game_name.clone(),
        tag_line: ranked.riot_id.tag_line.clone(),
        league_points: Some(ranked.entry.league_points),
        wins: Some(ranked.entry.wins),
        losses: Some(ranked.entry.losses),
        first_seen_date: now,
        days_in_challenger: 1,
        current_streak: 1,
        current_rank: Some(ranked.rank),
        avg_rank: None,
        avg_rank_all: f64::from(ranked.rank),
        rank_history: vec![ranked.rank],
        is_active: true,
        rank: 0,
    }
}

/// Returns whether the player was already active before this appearance.
fn record_appearance(player: &mut PlayerRecord, ranked: &RankedEntry) -> bool {
    let was_active = player.is_active;

    player.summoner_name = ranked.riot_id.game_name.clone();
    player.tag_line = ranked.riot_id.tag_line.clone();
    player.league_points = Some(ranked.entry.league_points);
    player.wins = Some(ranked.entry.wins);
    player.losses = Some(ranked.entry.losses);
    player.is_active = true;
    player.current_rank = Some(ranked.rank);
    player.current_streak = if was_active {
        player.current_streak + 1
    } else {
        1
    };

    player.rank_history.push(ranked.rank);
    // Older documents carry tenure without rank history, so tenure grows
    // from the stored count and only matches the history length for
    // records this tool created.
    player.days_in_challenger =
        (player.days_in_challenger + 1).max(player.rank_history.len() as u32);
    player.avg_rank_all = mean_rank(&player.rank_history);

    was_active
}

/// Tenure, history and averages are frozen; only the live standing resets.
fn record_absence(player: &mut PlayerRecord) -> bool {
    let was_active = player.is_active;
    player.is_active = false;
    player.current_rank = None;
    player.league_points = None;
    player.wins = None;
    player.losses = None;
    player.current_streak = 0;
    was_active
}

/// Merges `snapshot` into `history`.
///
/// Averages are published (`avg_rank`) for every record only when the
/// snapshot holds at least `visibility_threshold` entries. Overall rank
/// orders records by tenure, descending; equal tenure keeps the order the
/// records already had, with newcomers after existing players in ladder
/// order.
pub fn reconcile(
    history: RegionHistory,
    snapshot: &Snapshot,
    visibility_threshold: usize,
    now: DateTime<Utc>,
) -> (RegionHistory, ReconcileStats) {
    let mut stats = ReconcileStats::default();
    let RegionHistory {
        region,
        region_code,
        mut players,
        ..
    } = history;

    let mut last_seen: HashMap<&str, usize> = HashMap::new();
    for (idx, ranked) in snapshot.entries.iter().enumerate() {
        last_seen.insert(ranked.entry.puuid.as_str(), idx);
    }

    let mut index: HashMap<String, usize> = players
        .iter()
        .enumerate()
        .map(|(pos, p)| (p.puuid.clone(), pos))
        .collect();
    let mut touched = vec![false; players.len()];

    for (idx, ranked) in snapshot.entries.iter().enumerate() {
        if last_seen.get(ranked.entry.puuid.as_str()) != Some(&idx) {
            stats.duplicates += 1;
            continue;
        }
        match index.get(&ranked.entry.puuid) {
            Some(&pos) => {
                if record_appearance(&mut players[pos], ranked) {
                    stats.continuing += 1;
                } else {
                    stats.returning += 1;
                }
                touched[pos] = true;
            }
            None => {
                index.insert(ranked.entry.puuid.clone(), players.len());
                players.push(new_record(ranked, now));
                touched.push(true);
                stats.new_players += 1;
            }
        }
    }

    for (player, seen) in players.iter_mut().zip(&touched) {
        if !seen && record_absence(player) {
            stats.dropped += 1;
        }
    }

    let publish = snapshot.total_entries >= visibility_threshold;
    for player in &mut players {
        player.avg_rank = if publish && !player.rank_history.is_empty() {
            Some(player.avg_rank_all)
        } else {
            None
        };
    }

    // sort_by is stable, which is what keeps ties in prior order.
    players.sort_by(|a, b| b.days_in_challenger.cmp(&a.days_in_challenger));
    for (pos, player) in players.iter_mut().enumerate() {
        player.rank = pos as u32 + 1;
    }

    let reconciled = RegionHistory {
        region,
        region_code,
        players,
        last_update: Some(now),
    };
    (reconciled, stats)
}
