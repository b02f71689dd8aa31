use crate::error::AppError;
use crate::models::league::{LeagueList, RiotId};
use crate::validation;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const QUEUE: &str = "RANKED_SOLO_5x5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream leaderboard and account lookups.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Current Challenger ladder for a platform, best rank first.
    async fn challenger_league(&self, platform: &str) -> Result<LeagueList, AppError>;

    async fn account(&self, puuid: &str, routing: &str) -> Result<RiotId, AppError>;
}

pub struct RiotClient {
    client: reqwest::Client,
    api_key: String,
    host: String,
}

impl RiotClient {
    pub fn new(api_key: String, host: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(RiotClient {
            client,
            api_key,
            host,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, AppError> {
        let response = self
            .client
            .get(&url)
            .header("X-Riot-Token", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LeaderboardSource for RiotClient {
    async fn challenger_league(&self, platform: &str) -> Result<LeagueList, AppError> {
        let url = format!(
            "https://{}.{}/lol/league/v4/challengerleagues/by-queue/{}",
            platform, self.host, QUEUE
        );
        self.get_json(url).await
    }

    async fn account(&self, puuid: &str, routing: &str) -> Result<RiotId, AppError> {
        let url = format!(
            "https://{}.{}/riot/account/v1/accounts/by-puuid/{}",
            routing, self.host, puuid
        );
        self.get_json(url).await
    }
}

/// Looks up a display name, falling back to the unknown sentinel. Never
/// fails: a missing name must not cost the player their day.
pub async fn resolve_riot_id(source: &dyn LeaderboardSource, puuid: &str, routing: &str) -> RiotId {
    match source.account(puuid, routing).await {
        Ok(id) => {
            debug!(puuid, routing, "resolved riot id");
            validation::sanitize_riot_id(id)
        }
        Err(e) => {
            warn!(puuid, routing, error = %e, "account lookup failed");
            RiotId::unknown()
        }
    }
}
