use std::time::Duration;

use reqwest::{Request, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::{AppConfig, DEFAULT_API_BASE_URL};

use super::types::{
    FriendListResponse, GlobalAchievementPercent, GlobalAchievementsResponse,
    OwnedGamesResponse, PlayerAchievementsResponse, PlayerSummariesResponse,
    RecentlyPlayedResponse, SteamFriend, SteamOwnedGame, SteamPlayerAchievement,
    SteamPlayerSummary, SteamRecentGame,
};

const OWNED_GAMES: &str = "IPlayerService/GetOwnedGames/v0001";
const RECENTLY_PLAYED: &str = "IPlayerService/GetRecentlyPlayedGames/v0001";
const PLAYER_SUMMARIES: &str = "ISteamUser/GetPlayerSummaries/v0002";
const FRIEND_LIST: &str = "ISteamUser/GetFriendList/v0001";
const PLAYER_ACHIEVEMENTS: &str = "ISteamUserStats/GetPlayerAchievements/v0001";
const GLOBAL_PERCENTAGES: &str = "ISteamUserStats/GetGlobalAchievementPercentagesForApp/v0002";

/// Steam summaries accept at most this many ids per call.
pub const SUMMARY_BATCH: usize = 100;

/// Failures talking to the Steam Web API.
#[derive(Debug, Error)]
pub enum SteamError {
    /// No API key is configured.
    #[error("no Steam API key configured")]
    MissingApiKey,
    /// Input could not be read as a SteamID64 or profile URL.
    #[error("'{0}' is not a SteamID64 or profile URL")]
    InvalidSteamId(String),
    /// The profile hides the requested data.
    #[error("profile {0} is private")]
    PrivateProfile(String),
    /// Steam answered with a non-success status.
    #[error("{endpoint} returned {status}")]
    Status {
        /// Endpoint path that failed.
        endpoint: &'static str,
        /// Response status.
        status: StatusCode,
    },
    /// Transport or decoding failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Async client for the handful of Steam endpoints the library sync needs.
#[derive(Debug, Clone)]
pub struct SteamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SteamClient {
    /// Client against the public Steam API host.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SteamError> {
        Self::build(api_key.into(), DEFAULT_API_BASE_URL, Duration::from_secs(15))
    }

    /// Client configured from the application settings.
    pub fn from_config(config: &AppConfig) -> Result<Self, SteamError> {
        let api_key = config.api_key().ok_or(SteamError::MissingApiKey)?;
        Self::build(
            api_key.to_string(),
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    /// Point the client at another host, mainly for tests and proxies.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, SteamError> {
        if api_key.trim().is_empty() {
            return Err(SteamError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("steamscape/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Owned games including free-to-play titles with app info.
    pub async fn owned_games(&self, steam_id: &str) -> Result<Vec<SteamOwnedGame>, SteamError> {
        let payload: OwnedGamesResponse = self
            .get_json(
                OWNED_GAMES,
                &[
                    ("steamid", steam_id),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;
        Ok(payload.response.games)
    }

    /// Games played in the last two weeks.
    pub async fn recently_played(
        &self,
        steam_id: &str,
    ) -> Result<Vec<SteamRecentGame>, SteamError> {
        let payload: RecentlyPlayedResponse = self
            .get_json(RECENTLY_PLAYED, &[("steamid", steam_id)])
            .await?;
        Ok(payload.response.games)
    }

    /// Profile summaries for up to [`SUMMARY_BATCH`] ids.
    pub async fn player_summaries(
        &self,
        steam_ids: &[String],
    ) -> Result<Vec<SteamPlayerSummary>, SteamError> {
        if steam_ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = steam_ids.join(",");
        let payload: PlayerSummariesResponse = self
            .get_json(PLAYER_SUMMARIES, &[("steamids", joined.as_str())])
            .await?;
        Ok(payload.response.players)
    }

    /// Friend list; private profiles surface as [`SteamError::PrivateProfile`].
    pub async fn friend_list(&self, steam_id: &str) -> Result<Vec<SteamFriend>, SteamError> {
        let result: Result<FriendListResponse, SteamError> = self
            .get_json(
                FRIEND_LIST,
                &[("steamid", steam_id), ("relationship", "friend")],
            )
            .await;
        match result {
            Ok(payload) => Ok(payload.friendslist.friends),
            Err(SteamError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                Err(SteamError::PrivateProfile(steam_id.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// A player's achievement list for one app.
    pub async fn player_achievements(
        &self,
        steam_id: &str,
        app_id: u32,
    ) -> Result<Vec<SteamPlayerAchievement>, SteamError> {
        let app = app_id.to_string();
        let payload: PlayerAchievementsResponse = self
            .get_json(
                PLAYER_ACHIEVEMENTS,
                &[("steamid", steam_id), ("appid", app.as_str()), ("l", "english")],
            )
            .await?;
        Ok(payload.playerstats.achievements)
    }

    /// Global unlock percentages for one app. Needs no key but sends it anyway.
    pub async fn global_achievement_percentages(
        &self,
        app_id: u32,
    ) -> Result<Vec<GlobalAchievementPercent>, SteamError> {
        let app = app_id.to_string();
        let payload: GlobalAchievementsResponse = self
            .get_json(GLOBAL_PERCENTAGES, &[("gameid", app.as_str())])
            .await?;
        Ok(payload.achievementpercentages.achievements)
    }

    fn request(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Request, SteamError> {
        let url = format!("{}/{}/", self.base_url, endpoint);
        let request = self
            .http
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .query(params)
            .build()?;
        Ok(request)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, SteamError> {
        let request = self.request(endpoint, params)?;
        debug!(endpoint, "steam request");
        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SteamError::Status { endpoint, status });
        }
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steam::stub_server::respond_with;

    fn query(request: &Request) -> Vec<(String, String)> {
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn requests_carry_key_format_and_params() -> anyhow::Result<()> {
        let client = SteamClient::new("secret")?.with_base_url("http://steam.test/");
        let request = client.request(
            OWNED_GAMES,
            &[("steamid", "76561198000000001"), ("include_appinfo", "1")],
        )?;

        assert_eq!(request.url().path(), "/IPlayerService/GetOwnedGames/v0001/");
        assert_eq!(request.url().host_str(), Some("steam.test"));
        let pairs = query(&request);
        assert!(pairs.contains(&("key".to_string(), "secret".to_string())));
        assert!(pairs.contains(&("format".to_string(), "json".to_string())));
        assert!(pairs.contains(&("steamid".to_string(), "76561198000000001".to_string())));
        assert!(pairs.contains(&("include_appinfo".to_string(), "1".to_string())));
        Ok(())
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(SteamClient::new("  "), Err(SteamError::MissingApiKey)));

        let config = AppConfig::default();
        assert!(matches!(
            SteamClient::from_config(&config),
            Err(SteamError::MissingApiKey)
        ));
    }

    #[test]
    fn from_config_uses_configured_host() -> anyhow::Result<()> {
        let config = AppConfig {
            steam_api_key: Some("k".to_string()),
            api_base_url: "http://localhost:8080".to_string(),
            ..AppConfig::default()
        };
        let client = SteamClient::from_config(&config)?;
        let request = client.request(FRIEND_LIST, &[("steamid", "1")])?;
        assert_eq!(request.url().port(), Some(8080));
        Ok(())
    }

    #[tokio::test]
    async fn empty_summary_batch_skips_the_network() -> anyhow::Result<()> {
        // nothing listens here; an attempted request would fail
        let client = SteamClient::new("k")?.with_base_url("http://127.0.0.1:9");
        assert!(client.player_summaries(&[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_friend_list_means_private_profile() -> anyhow::Result<()> {
        let base = respond_with("HTTP/1.1 403 Forbidden", 1)?;
        let client = SteamClient::new("k")?.with_base_url(base);
        match client.friend_list("76561198000000001").await {
            Err(SteamError::PrivateProfile(id)) => assert_eq!(id, "76561198000000001"),
            other => anyhow::bail!("expected a private profile, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn other_failures_keep_their_status() -> anyhow::Result<()> {
        let base = respond_with("HTTP/1.1 500 Internal Server Error", 1)?;
        let client = SteamClient::new("k")?.with_base_url(base);
        match client.friend_list("76561198000000001").await {
            Err(SteamError::Status { endpoint, status }) => {
                assert_eq!(endpoint, FRIEND_LIST);
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => anyhow::bail!("expected a status error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_an_http_error() -> anyhow::Result<()> {
        let client = SteamClient::new("k")?.with_base_url("http://127.0.0.1:9");
        let err = client.owned_games("76561198000000001").await;
        assert!(matches!(err, Err(SteamError::Http(_))));
        Ok(())
    }
}
