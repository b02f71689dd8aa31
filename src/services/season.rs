//! Season reset detection from a small sample of regions.

use crate::config::ResetPolicy;
use crate::services::riot::LeaderboardSource;
use crate::store::DocumentStore;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleObservation {
    pub code: String,
    /// The persisted history had at least one active player.
    pub had_data: bool,
    /// Live ladder size, `None` when the fetch failed.
    pub live_entries: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetVerdict {
    pub reset: bool,
    pub empty_count: usize,
    pub had_data_count: usize,
    pub checked: usize,
    pub observations: Vec<SampleObservation>,
}

/// Regions whose fetch failed count toward nothing: an outage must never
/// look like an emptied ladder.
pub fn evaluate(observations: Vec<SampleObservation>, policy: ResetPolicy) -> ResetVerdict {
    let mut empty_count = 0;
    let mut had_data_count = 0;
    let mut checked = 0;
    for obs in &observations {
        let Some(live) = obs.live_entries else {
            continue;
        };
        checked += 1;
        if obs.had_data {
            had_data_count += 1;
            if live == 0 {
                empty_count += 1;
            }
        }
    }
    ResetVerdict {
        reset: empty_count >= policy.min_empty && had_data_count >= policy.min_had_data,
        empty_count,
        had_data_count,
        checked,
        observations,
    }
}

fn had_data(store: &dyn DocumentStore, code: &str) -> bool {
    match store.load_region(code) {
        Ok(Some(history)) => history.has_active_players(),
        Ok(None) => false,
        Err(e) => {
            warn!(region = code, error = %e, "unreadable history, treating as no data");
            false
        }
    }
}

pub async fn detect_reset(
    sample: &[String],
    store: &dyn DocumentStore,
    source: &dyn LeaderboardSource,
    policy: ResetPolicy,
    request_delay: Duration,
) -> ResetVerdict {
    let mut observations = Vec::with_capacity(sample.len());
    for code in sample {
        let had_data = had_data(store, code);
        let live_entries = match source.challenger_league(code).await {
            Ok(league) => Some(league.entries.len()),
            Err(e) => {
                warn!(region = %code, error = %e, "reset check fetch failed");
                None
            }
        };
        if let Some(live) = live_entries {
            info!(region = %code, players = live, had_data, "sampled region");
        }
        observations.push(SampleObservation {
            code: code.clone(),
            had_data,
            live_entries,
        });
        tokio::time::sleep(request_delay).await;
    }

    let verdict = evaluate(observations, policy);
    if verdict.reset {
        info!(
            empty = verdict.empty_count,
            checked = verdict.checked,
            "season reset detected"
        );
    } else {
        info!(
            empty = verdict.empty_count,
            checked = verdict.checked,
            "no season reset"
        );
    }
    verdict
}
