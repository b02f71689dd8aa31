use crate::error::AppError;
use crate::validation;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Share of a region's leaderboard capacity that must be present before
/// averages are published.
const VISIBILITY_PERCENT: usize = 15;

#[derive(Debug, Parser)]
#[command(
    name = "challenger-tracker",
    version,
    about = "Tracks Challenger tenure, streaks and rank history across regions"
)]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Defaults to `update`
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn into_command(self) -> (CommonArgs, Command) {
        let command = self
            .command
            .unwrap_or_else(|| Command::Update(UpdateArgs::from_env()));
        (self.common, command)
    }
}

#[derive(Debug, Parser)]
struct UpdateOnly {
    #[command(flatten)]
    args: UpdateArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Directory holding live region documents and archives
    #[arg(long, env = "DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreBackend::Fs, global = true)]
    pub store: StoreBackend,

    /// SQLite database used by the `sqlite` backend
    #[arg(long, env = "DATABASE_PATH", default_value = "challenger.db", global = true)]
    pub database_path: PathBuf,

    /// JSON file replacing the built-in routing table
    #[arg(long, env = "ROUTING_FILE", global = true)]
    pub routing_file: Option<PathBuf>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Fs,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check for a season reset, then reconcile every region
    Update(UpdateArgs),
    /// Serve persisted documents over HTTP for dashboards
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    #[arg(long, env = "RIOT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "RIOT_API_HOST", default_value = "api.riotgames.com")]
    pub api_host: String,

    /// Pause after every upstream request, in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value_t = 1200)]
    pub request_delay_ms: u64,

    /// Regions sampled when checking for a season reset
    #[arg(long, env = "RESET_SAMPLE", value_delimiter = ',', default_value = "euw1,na1,kr")]
    pub reset_sample: Vec<String>,

    #[arg(long, env = "RESET_MIN_EMPTY", default_value_t = 2)]
    pub reset_min_empty: usize,

    #[arg(long, env = "RESET_MIN_HAD_DATA", default_value_t = 2)]
    pub reset_min_had_data: usize,
}

impl UpdateArgs {
    /// Resolves update arguments from the environment alone, for runs
    /// started without a subcommand.
    pub fn from_env() -> Self {
        UpdateOnly::parse_from([env!("CARGO_PKG_NAME")]).args
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub code: String,
    pub name: String,
    /// Maximum number of Challenger slots on this platform.
    pub capacity: u32,
}

impl RegionConfig {
    fn new(code: &str, name: &str, capacity: u32) -> Self {
        RegionConfig {
            code: code.into(),
            name: name.into(),
            capacity,
        }
    }

    pub fn visibility_threshold(&self) -> usize {
        self.capacity as usize * VISIBILITY_PERCENT / 100
    }
}

/// Regions sharing one upstream routing endpoint, and therefore one
/// request budget. Processed sequentially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingGroup {
    pub routing: String,
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    pub groups: Vec<RoutingGroup>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        let group = |routing: &str, regions: &[(&str, &str, u32)]| RoutingGroup {
            routing: routing.into(),
            regions: regions
                .iter()
                .map(|(code, name, cap)| RegionConfig::new(code, name, *cap))
                .collect(),
        };
        RoutingTable {
            groups: vec![
                group(
                    "americas",
                    &[
                        ("na1", "North America", 300),
                        ("br1", "Brazil", 200),
                        ("tw2", "Taiwan", 200),
                        ("eun1", "Europe Nordic & East", 200),
                        ("jp1", "Japan", 50),
                        ("ru", "Russia", 50),
                    ],
                ),
                group(
                    "europe",
                    &[
                        ("euw1", "Europe West", 300),
                        ("tr1", "Turkey", 200),
                        ("vn2", "Vietnam", 300),
                        ("oc1", "Oceania", 50),
                        ("me1", "Middle East", 50),
                    ],
                ),
                group(
                    "asia",
                    &[
                        ("kr", "Korea", 300),
                        ("sg2", "Southeast Asia", 300),
                        ("la1", "Latin America North", 200),
                        ("la2", "Latin America South", 200),
                    ],
                ),
            ],
        }
    }
}

impl RoutingTable {
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let table = match path {
            Some(path) => {
                let raw = std::fs::read(path)?;
                serde_json::from_slice(&raw)?
            }
            None => RoutingTable::default(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Groups must be disjoint: a region owned by two groups could be
    /// reconciled concurrently.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.routing.trim().is_empty() {
                return Err(AppError::Config("routing group without a name".into()));
            }
            for region in &group.regions {
                validation::validate_region_code(&region.code)
                    .map_err(|e| AppError::Config(e.to_string()))?;
                if region.capacity == 0 {
                    return Err(AppError::Config(format!(
                        "region {} has zero capacity",
                        region.code
                    )));
                }
                if !seen.insert(region.code.as_str()) {
                    return Err(AppError::Config(format!(
                        "region {} assigned to more than one group",
                        region.code
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn regions(&self) -> impl Iterator<Item = (&RoutingGroup, &RegionConfig)> {
        self.groups
            .iter()
            .flat_map(|g| g.regions.iter().map(move |r| (g, r)))
    }

    pub fn find(&self, code: &str) -> Option<(&RoutingGroup, &RegionConfig)> {
        self.regions().find(|(_, r)| r.code == code)
    }
}

/// Consensus required before a season reset is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPolicy {
    /// Sampled regions that had data and are now empty.
    pub min_empty: usize,
    /// Sampled regions that had data at all.
    pub min_had_data: usize,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        ResetPolicy {
            min_empty: 2,
            min_had_data: 2,
        }
    }
}

/// Everything an `update` run needs, resolved and validated up front.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub routing: RoutingTable,
    pub request_delay: Duration,
    pub reset_sample: Vec<String>,
    pub reset_policy: ResetPolicy,
}

impl UpdateConfig {
    pub fn new(routing: RoutingTable, args: &UpdateArgs) -> Result<Self, AppError> {
        let reset_sample: Vec<String> = args
            .reset_sample
            .iter()
            .map(|code| code.trim().to_lowercase())
            .filter(|code| !code.is_empty())
            .collect();
        for code in &reset_sample {
            if routing.find(code).is_none() {
                return Err(AppError::Config(format!(
                    "reset sample region {} is not in the routing table",
                    code
                )));
            }
        }
        Ok(UpdateConfig {
            routing,
            request_delay: Duration::from_millis(args.request_delay_ms),
            reset_sample,
            reset_policy: ResetPolicy {
                min_empty: args.reset_min_empty,
                min_had_data: args.reset_min_had_data,
            },
        })
    }
}
