mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;
#[cfg(test)]
mod testing;
mod validation;

use clap::Parser;
use config::{
    Cli, Command, CommonArgs, LogFormat, RoutingTable, ServeArgs, StoreBackend, UpdateArgs,
    UpdateConfig,
};
use db::Db;
use error::AppError;
use ntex::web;
use ntex_cors::Cors;
use services::orchestrator::{RegionOutcome, RunReport, Tracker};
use services::riot::RiotClient;
use std::process::ExitCode;
use std::sync::Arc;
use store::{FsStore, SharedStore, SqliteStore};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code when required credentials are missing.
const EXIT_MISSING_CREDENTIALS: u8 = 2;

#[ntex::main]
async fn main() -> ExitCode {
    let (common, command) = Cli::parse().into_command();
    init_logging(common.log_format);

    let result = match command {
        Command::Update(args) => run_update(&common, &args).await,
        Command::Serve(args) => run_serve(&common, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ AppError::MissingCredentials) => {
            error!("{}", e);
            ExitCode::from(EXIT_MISSING_CREDENTIALS)
        }
        Err(e) => {
            error!(error = %e, details = ?e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

fn open_store(common: &CommonArgs) -> Result<SharedStore, AppError> {
    let store: SharedStore = match common.store {
        StoreBackend::Fs => Arc::new(FsStore::new(&common.data_dir)),
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(Db::open(&common.database_path)?)),
    };
    Ok(store)
}

fn require_api_key(args: &UpdateArgs) -> Result<String, AppError> {
    args.api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingCredentials)
}

async fn run_update(common: &CommonArgs, args: &UpdateArgs) -> Result<(), AppError> {
    let api_key = require_api_key(args)?;
    let routing = RoutingTable::load(common.routing_file.as_deref())?;
    let config = UpdateConfig::new(routing, args)?;
    let store = open_store(common)?;
    let source = Arc::new(RiotClient::new(api_key, args.api_host.clone())?);

    info!("starting multi-region challenger update");
    let report = Tracker::new(config, store, source).run().await?;
    log_summary(&report);
    Ok(())
}

fn log_summary(report: &RunReport) {
    if let Some(archive) = &report.archive {
        info!(
            archive = %archive.manifest.archive_name,
            archived = archive.manifest.regions_archived,
            cleared = archive.cleared.len(),
            "season archived"
        );
        for code in archive.failed() {
            warn!(region = code, "region was not archived; live history kept");
        }
    }
    for region in &report.regions {
        match &region.outcome {
            RegionOutcome::Updated { .. } => {}
            RegionOutcome::Skipped { reason } => {
                warn!(group = %region.group, region = %region.region, %reason, "region skipped")
            }
            RegionOutcome::Failed { error } => {
                error!(group = %region.group, region = %region.region, %error, "region failed")
            }
        }
    }
    info!(
        run_id = %report.run_id,
        reset = report.reset.reset,
        sampled = report.reset.observations.len(),
        updated = report.updated(),
        total = report.regions.len(),
        minutes = %format!("{:.1}", report.elapsed.as_secs_f64() / 60.0),
        "update finished"
    );
}

async fn run_serve(common: &CommonArgs, args: ServeArgs) -> Result<(), AppError> {
    let routing = Arc::new(RoutingTable::load(common.routing_file.as_deref())?);
    let store = open_store(common)?;

    info!("Challenger dashboard API starting on {}:{}", args.host, args.port);

    web::HttpServer::new(move || {
        web::App::new()
            .state(store.clone())
            .state(routing.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "OPTIONS"])
                    .max_age(3600)
                    .finish(),
            )
            .configure(routes)
    })
    .bind(format!("{}:{}", args.host, args.port))?
    .run()
    .await?;
    Ok(())
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health))
        .route("/api/regions", web::get().to(handlers::regions::list_regions))
        .route("/api/regions/{code}", web::get().to(handlers::regions::get_region))
        .route("/api/seasons", web::get().to(handlers::seasons::get_seasons))
        .route("/api/archives/{name}", web::get().to(handlers::seasons::get_manifest))
        .route(
            "/api/archives/{name}/{code}",
            web::get().to(handlers::seasons::get_archived_region),
        );
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegionConfig, ResetPolicy, RoutingGroup};
    use crate::models::player::RegionHistory;
    use crate::services::archiver;
    use ntex::http::StatusCode;
    use ntex::web::test as web_test;
    use crate::testing::{entry, ladder, FakeSource};
    use chrono::{Datelike, Utc};
    use serde_json::json;
    use std::time::Duration;

    fn routing() -> RoutingTable {
        let region = |code: &str, capacity| RegionConfig {
            code: code.into(),
            name: code.to_uppercase(),
            capacity,
        };
        RoutingTable {
            groups: vec![
                RoutingGroup {
                    routing: "americas".into(),
                    regions: vec![region("na1", 300)],
                },
                RoutingGroup {
                    routing: "europe".into(),
                    regions: vec![region("euw1", 300), region("tr1", 20)],
                },
                RoutingGroup {
                    routing: "asia".into(),
                    regions: vec![region("kr", 300)],
                },
            ],
        }
    }

    fn tracker(store: SharedStore, source: Arc<FakeSource>) -> Tracker {
        let config = UpdateConfig {
            routing: routing(),
            request_delay: Duration::ZERO,
            reset_sample: vec!["euw1".into(), "na1".into(), "kr".into()],
            reset_policy: ResetPolicy::default(),
        };
        Tracker::new(config, store, source)
    }

    fn outcome<'a>(report: &'a RunReport, code: &str) -> &'a RegionOutcome {
        &report
            .regions
            .iter()
            .find(|r| r.region == code)
            .unwrap()
            .outcome
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let mut args = UpdateArgs::from_env();
        args.api_key = None;
        assert!(matches!(
            require_api_key(&args),
            Err(AppError::MissingCredentials)
        ));
        args.api_key = Some("   ".into());
        assert!(require_api_key(&args).is_err());
        args.api_key = Some("RGAPI-test".into());
        assert_eq!(require_api_key(&args).unwrap(), "RGAPI-test");
    }

    #[tokio::test]
    async fn test_run_updates_every_group_and_skips_failed_fetch() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        let stale = RegionHistory::empty("tr1", "Turkey");
        store.save_region("tr1", &stale).unwrap();
        let stale_bytes = store.load_region_raw("tr1").unwrap();

        let source = Arc::new(
            FakeSource::new()
                .with_league("na1", ladder(&["n1", "n2"]))
                .with_league("euw1", ladder(&["e1", "e2", "e3"]))
                .with_failure("tr1", 500)
                .with_league("kr", ladder(&["k1"])),
        );
        let report = tracker(store.clone(), source.clone()).run().await.unwrap();

        assert!(!report.reset.reset);
        assert!(report.archive.is_none());
        assert_eq!(report.regions.len(), 4);
        assert_eq!(report.updated(), 3);
        assert!(matches!(outcome(&report, "tr1"), RegionOutcome::Skipped { .. }));
        assert_eq!(store.load_region_raw("tr1").unwrap(), stale_bytes);

        let euw = store.load_region("euw1").unwrap().unwrap();
        assert_eq!(euw.region, "EUW1");
        assert_eq!(euw.players.len(), 3);
        assert_eq!(euw.player("e2").unwrap().current_rank, Some(2));
        assert!(euw.last_update.is_some());

        // Within a group regions run in configured order.
        let calls = source.league_calls();
        let euw_at = calls.iter().rposition(|c| c == "euw1").unwrap();
        let tr_at = calls.iter().position(|c| c == "tr1").unwrap();
        assert!(euw_at < tr_at);
    }

    #[tokio::test]
    async fn test_enrichment_and_malformed_entries_are_soft_failures() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        let source = Arc::new(
            FakeSource::new()
                .with_league(
                    "kr",
                    vec![
                        entry("faker", 1800),
                        json!({"leaguePoints": "lots"}),
                        entry("chovy", 1700),
                    ],
                )
                .with_account("faker", "Hide on bush", "KR1")
                .with_failing_account("chovy"),
        );
        let report = tracker(store.clone(), source).run().await.unwrap();

        match outcome(&report, "kr") {
            RegionOutcome::Updated {
                players,
                skipped_entries,
                ..
            } => {
                assert_eq!(*players, 2);
                assert_eq!(*skipped_entries, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        let kr = store.load_region("kr").unwrap().unwrap();
        let faker = kr.player("faker").unwrap();
        assert_eq!(faker.summoner_name, "Hide on bush");
        assert_eq!(faker.tag_line, "KR1");
        let chovy = kr.player("chovy").unwrap();
        assert_eq!(chovy.summoner_name, "Unknown");
        assert_eq!(chovy.tag_line, "0000");
        assert_eq!(chovy.current_rank, Some(3));
    }

    #[tokio::test]
    async fn test_tr1_publishes_averages_above_its_small_threshold() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        // Capacity 20 gives a threshold of 3.
        let source = Arc::new(
            FakeSource::new()
                .with_league("tr1", ladder(&["t1", "t2", "t3"]))
                .with_league("kr", ladder(&["k1", "k2", "k3"])),
        );
        tracker(store.clone(), source).run().await.unwrap();

        let tr = store.load_region("tr1").unwrap().unwrap();
        assert!(tr.players.iter().all(|p| p.avg_rank.is_some()));
        let kr = store.load_region("kr").unwrap().unwrap();
        assert!(kr.players.iter().all(|p| p.avg_rank.is_none()));
    }

    #[tokio::test]
    async fn test_season_reset_archives_before_reconciling() {
        let dir = tempfile::tempdir().unwrap();
        let store: SharedStore = Arc::new(FsStore::new(dir.path()));
        let source = Arc::new(
            FakeSource::new()
                .with_league("na1", ladder(&["n1", "n2"]))
                .with_league("euw1", ladder(&["e1", "e2"]))
                .with_league("kr", ladder(&["k1", "k2"])),
        );
        let tracker = tracker(store.clone(), source.clone());
        tracker.run().await.unwrap();
        tracker.run().await.unwrap();
        let day_two_kr = std::fs::read(dir.path().join("kr_players.json")).unwrap();

        source.set_league("euw1", vec![]);
        source.set_league("na1", vec![]);
        source.set_league("kr", ladder(&["k3", "k1"]));
        let report = tracker.run().await.unwrap();

        let archive_name = format!("{}_1", Utc::now().year());
        assert!(report.reset.reset);
        let archive = report.archive.as_ref().unwrap();
        assert_eq!(archive.manifest.archive_name, archive_name);
        assert_eq!(archive.manifest.regions_archived, 3);

        let archived_kr = std::fs::read(
            dir.path()
                .join("archives")
                .join(&archive_name)
                .join("kr_players.json"),
        )
        .unwrap();
        assert_eq!(archived_kr, day_two_kr);
        assert!(dir
            .path()
            .join("archives")
            .join(&archive_name)
            .join("metadata.json")
            .exists());

        let seasons: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("archives/seasons.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(seasons["seasons"], json!([archive_name]));

        // Live history restarted from zero after the archive.
        let kr = store.load_region("kr").unwrap().unwrap();
        assert_eq!(kr.players.len(), 2);
        let k1 = kr.player("k1").unwrap();
        assert_eq!(k1.days_in_challenger, 1);
        assert_eq!(k1.rank_history, vec![2]);
        assert_eq!(k1.current_streak, 1);
        let euw = store.load_region("euw1").unwrap().unwrap();
        assert!(euw.players.is_empty());
    }

    #[tokio::test]
    async fn test_cold_start_with_empty_ladders_does_not_archive() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        let source = Arc::new(
            FakeSource::new()
                .with_league("na1", vec![])
                .with_league("euw1", vec![])
                .with_league("kr", vec![]),
        );
        let report = tracker(store.clone(), source).run().await.unwrap();
        assert!(!report.reset.reset);
        assert!(report.archive.is_none());
        assert!(store.archive_names().unwrap().is_empty());
    }

    async fn json_body(resp: web::WebResponse) -> serde_json::Value {
        serde_json::from_slice(&web_test::read_body(resp).await).unwrap()
    }

    #[ntex::test]
    async fn test_dashboard_routes() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory().unwrap());
        let routing = Arc::new(routing());
        store
            .save_region("kr", &RegionHistory::empty("kr", "KR"))
            .unwrap();
        let live = store.load_region_raw("kr").unwrap().unwrap();
        let report = archiver::archive_all(&*store, &routing, Utc::now()).unwrap();
        let archive_name = report.manifest.archive_name.clone();

        let app = web_test::init_service(
            web::App::new()
                .state(store.clone())
                .state(routing.clone())
                .configure(routes),
        )
        .await;

        let get = |uri: String| web_test::TestRequest::with_uri(&uri).to_request();

        let resp = web_test::call_service(&app, get("/api/health".into())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body["status"], "ok");

        let resp = web_test::call_service(&app, get("/api/regions".into())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 4);

        // Archived regions read back as an empty live document.
        let resp = web_test::call_service(&app, get("/api/regions/kr".into())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let history: RegionHistory =
            serde_json::from_slice(&web_test::read_body(resp).await).unwrap();
        assert!(history.players.is_empty());

        let resp = web_test::call_service(&app, get("/api/regions/zz9".into())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = web_test::call_service(&app, get("/api/seasons".into())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body["seasons"], json!([archive_name.clone()]));

        let resp = web_test::call_service(&app, get(format!("/api/archives/{archive_name}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body["regions_archived"], 1);

        let resp =
            web_test::call_service(&app, get(format!("/api/archives/{archive_name}/kr"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(web_test::read_body(resp).await.to_vec(), live);

        let resp = web_test::call_service(&app, get("/api/archives/not-an-archive".into())).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
