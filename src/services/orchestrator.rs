//! Drives one daily run: reset check, optional archival, then every routing
//! group in parallel with its regions in configured order.

use crate::config::{RegionConfig, RoutingGroup, UpdateConfig};
use crate::error::AppError;
use crate::models::league::{RankedEntry, Snapshot};
use crate::models::player::RegionHistory;
use crate::services::archiver::{self, ArchiveReport};
use crate::services::reconciler::{self, EntryOutcome, ReconcileStats};
use crate::services::riot::{self, LeaderboardSource};
use crate::services::season::{self, ResetVerdict};
use crate::store::SharedStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    Updated {
        players: usize,
        active: usize,
        skipped_entries: usize,
        stats: ReconcileStats,
    },
    /// The ladder could not be fetched; persisted history is untouched.
    Skipped { reason: String },
    /// Reconciliation could not complete; persisted history is untouched.
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct RegionReport {
    pub group: String,
    pub region: String,
    pub outcome: RegionOutcome,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub reset: ResetVerdict,
    pub archive: Option<ArchiveReport>,
    pub regions: Vec<RegionReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn updated(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| matches!(r.outcome, RegionOutcome::Updated { .. }))
            .count()
    }
}

#[derive(Clone)]
pub struct Tracker {
    config: Arc<UpdateConfig>,
    store: SharedStore,
    source: Arc<dyn LeaderboardSource>,
}

impl Tracker {
    pub fn new(
        config: UpdateConfig,
        store: SharedStore,
        source: Arc<dyn LeaderboardSource>,
    ) -> Self {
        Tracker {
            config: Arc::new(config),
            store,
            source,
        }
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }

    pub async fn run(&self) -> Result<RunReport, AppError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunReport, AppError> {
        let started = Instant::now();

        info!("checking for season reset");
        let reset = season::detect_reset(
            &self.config.reset_sample,
            self.store.as_ref(),
            self.source.as_ref(),
            self.config.reset_policy,
            self.config.request_delay,
        )
        .await;

        let archive = if reset.reset {
            Some(archiver::archive_all(
                self.store.as_ref(),
                &self.config.routing,
                Utc::now(),
            )?)
        } else {
            None
        };

        let mut groups = JoinSet::new();
        for group in &self.config.routing.groups {
            let tracker = self.clone();
            let group = group.clone();
            let span = info_span!("group", group = %group.routing);
            groups.spawn(async move { tracker.process_group(&group).await }.instrument(span));
        }

        let mut regions = Vec::new();
        let mut crashed = 0;
        while let Some(joined) = groups.join_next().await {
            match joined {
                Ok(reports) => regions.extend(reports),
                Err(e) => {
                    error!(error = %e, "routing group task failed");
                    crashed += 1;
                }
            }
        }
        if crashed > 0 {
            return Err(AppError::Internal(format!(
                "{} routing group(s) did not finish",
                crashed
            )));
        }

        let report = RunReport {
            run_id,
            reset,
            archive,
            regions,
            elapsed: started.elapsed(),
        };
        info!(
            updated = report.updated(),
            regions = report.regions.len(),
            elapsed_secs = report.elapsed.as_secs(),
            "all regions completed"
        );
        Ok(report)
    }

    async fn process_group(&self, group: &RoutingGroup) -> Vec<RegionReport> {
        info!(regions = group.regions.len(), "starting routing group");
        let started = Instant::now();
        let mut reports = Vec::with_capacity(group.regions.len());
        for region in &group.regions {
            let span = info_span!("region", region = %region.code);
            let outcome = self
                .update_region(&group.routing, region)
                .instrument(span)
                .await;
            reports.push(RegionReport {
                group: group.routing.clone(),
                region: region.code.clone(),
                outcome,
            });
        }
        info!(elapsed_secs = started.elapsed().as_secs(), "routing group completed");
        reports
    }

    /// Reconciles one region entirely in memory and writes it back only
    /// once everything succeeded.
    pub async fn update_region(&self, routing: &str, region: &RegionConfig) -> RegionOutcome {
        info!(name = %region.name, capacity = region.capacity, "processing region");

        let league = self.source.challenger_league(&region.code).await;
        self.pause().await;
        let league = match league {
            Ok(league) => league,
            Err(e) => {
                warn!(error = %e, "failed to fetch ladder, region skipped");
                return RegionOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let mut history = match self.store.load_region(&region.code) {
            Ok(Some(history)) => history,
            Ok(None) => RegionHistory::empty(&region.code, &region.name),
            Err(e) => {
                error!(error = %e, "could not load history, region left untouched");
                return RegionOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };
        history.region = region.name.clone();
        history.region_code = region.code.clone();

        let threshold = region.visibility_threshold();
        let total = league.entries.len();
        info!(players = total, threshold, "ladder fetched");

        let mut snapshot = Snapshot {
            entries: Vec::with_capacity(total),
            total_entries: total,
        };
        let mut skipped = 0;
        for (processed, outcome) in reconciler::classify_entries(&league.entries)
            .into_iter()
            .enumerate()
        {
            match outcome {
                EntryOutcome::Accepted { rank, entry } => {
                    let riot_id =
                        riot::resolve_riot_id(self.source.as_ref(), &entry.puuid, routing).await;
                    self.pause().await;
                    snapshot.entries.push(RankedEntry {
                        rank,
                        entry,
                        riot_id,
                    });
                }
                EntryOutcome::Skipped { rank, reason } => {
                    warn!(rank, %reason, "skipping malformed entry");
                    skipped += 1;
                }
            }
            if (processed + 1) % PROGRESS_EVERY == 0 {
                info!("progress: {}/{} players processed", processed + 1, total);
            }
        }

        let (history, stats) = reconciler::reconcile(history, &snapshot, threshold, Utc::now());
        let players = history.players.len();
        let active = history.players.iter().filter(|p| p.is_active).count();

        if let Err(e) = self.store.save_region(&region.code, &history) {
            error!(error = %e, "could not save history");
            return RegionOutcome::Failed {
                error: e.to_string(),
            };
        }
        info!(
            players,
            active,
            new = stats.new_players,
            dropped = stats.dropped,
            skipped,
            "region completed"
        );
        RegionOutcome::Updated {
            players,
            active,
            skipped_entries: skipped,
            stats,
        }
    }
}
