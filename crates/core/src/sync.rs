//! Background sync of Steam data into the library store.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    models::{FriendEntry, OwnedGameRecord, UserLibrary},
    steam::{
        achievement_progress, parse_steam_id, rarest_unlocked,
        types::{SteamOwnedGame, SteamRecentGame},
        SteamClient, SteamError, SUMMARY_BATCH,
    },
    store::{LibraryStore, UpsertSummary},
};

/// Events emitted by the background library sync.
#[derive(Debug)]
pub enum SyncEvent {
    /// The library was refreshed from Steam.
    Success {
        /// Owner of the refreshed library.
        steam_id: String,
        /// Owned games now cached.
        games: usize,
        /// Friends now cached.
        friends: usize,
        /// Completion time.
        synced_at: DateTime<Utc>,
    },
    /// Sync failed with an error.
    Error(anyhow::Error),
}

/// Counts gathered by one full sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Owner of the library.
    pub steam_id: String,
    /// Owned games after the upsert.
    pub games: usize,
    /// Friends after the refresh.
    pub friends: usize,
    /// Games enriched with achievement data.
    pub achievements: usize,
    /// Completion time.
    pub synced_at: DateTime<Utc>,
}

/// Pulls a user's Steam data into the [`LibraryStore`].
pub struct LibrarySync {
    config: AppConfig,
    client: SteamClient,
    store: LibraryStore,
}

impl LibrarySync {
    /// Create a synchroniser over an existing client and store.
    pub fn new(config: AppConfig, client: SteamClient, store: LibraryStore) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Build the client and store from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let client = SteamClient::from_config(&config).context("failed to create Steam client")?;
        let store = LibraryStore::from_config(&config);
        Ok(Self::new(config, client, store))
    }

    /// Store the synchroniser writes into.
    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    /// Cached library for a user, without touching the network.
    pub fn prepare(&self, steam_id: &str) -> Result<UserLibrary> {
        let steam_id = parse_steam_id(steam_id)?;
        self.store.library(&steam_id)
    }

    /// Run a full sync, reporting the outcome on `sender`.
    pub async fn run(self, steam_id: String, sender: mpsc::Sender<SyncEvent>) -> Result<()> {
        match self.sync_all(&steam_id).await {
            Ok(report) => {
                sender
                    .send(SyncEvent::Success {
                        steam_id: report.steam_id,
                        games: report.games,
                        friends: report.friends,
                        synced_at: report.synced_at,
                    })
                    .await
                    .context("failed to send sync success event")?;
            }
            Err(err) => {
                let _ = sender.send(SyncEvent::Error(err)).await;
            }
        }
        Ok(())
    }

    /// Profile, owned games, friends, then achievements when enabled.
    pub async fn sync_all(&self, steam_id: &str) -> Result<SyncReport> {
        let steam_id = parse_steam_id(steam_id)?;
        info!(steam_id = %steam_id, "syncing library");

        self.sync_profile(&steam_id).await?;
        let upserted = self.sync_owned_games(&steam_id).await?;
        let friends = match self.sync_friends(&steam_id).await {
            Ok(count) => count,
            Err(err) => {
                warn!("friend sync failed for {steam_id}: {err:#}");
                self.store.library(&steam_id)?.friends.len()
            }
        };
        let achievements = self.sync_achievements(&steam_id).await?;

        let synced_at = Utc::now();
        self.store.mark_synced(&steam_id, synced_at)?;
        let games = self.store.games(&steam_id)?.len();
        info!(
            steam_id = %steam_id,
            games,
            inserted = upserted.inserted,
            updated = upserted.updated,
            friends,
            achievements,
            "library sync finished"
        );

        Ok(SyncReport {
            steam_id,
            games,
            friends,
            achievements,
            synced_at,
        })
    }

    /// Refresh the owner's profile summary.
    pub async fn sync_profile(&self, steam_id: &str) -> Result<()> {
        let summaries = self
            .client
            .player_summaries(&[steam_id.to_string()])
            .await
            .context("failed to fetch player summary")?;
        let Some(summary) = summaries.into_iter().find(|s| s.steamid == steam_id) else {
            anyhow::bail!("Steam returned no profile for {steam_id}");
        };
        self.store.upsert_profile(summary.into_profile(Utc::now()))
    }

    /// Fetch owned games, fill recent playtime from the recently-played list
    /// and upsert them.
    pub async fn sync_owned_games(&self, steam_id: &str) -> Result<UpsertSummary> {
        let owned = self
            .client
            .owned_games(steam_id)
            .await
            .context("failed to fetch owned games")?;
        if owned.is_empty() {
            warn!("no owned games returned for {steam_id}; the game details may be private");
        }

        let recent = match self.client.recently_played(steam_id).await {
            Ok(recent) => recent,
            Err(err) => {
                warn!("recently played lookup failed for {steam_id}: {err}");
                Vec::new()
            }
        };

        let summary = self
            .store
            .upsert_games(steam_id, merge_recent_playtime(owned, &recent))?;
        if summary.skipped > 0 {
            warn!(skipped = summary.skipped, "owned games without an app id were ignored");
        }
        Ok(summary)
    }

    /// Refresh the friend list and cache each friend's profile.
    pub async fn sync_friends(&self, steam_id: &str) -> Result<usize> {
        let friends: Vec<FriendEntry> = match self.client.friend_list(steam_id).await {
            Ok(friends) => friends.into_iter().map(Into::into).collect(),
            Err(SteamError::PrivateProfile(_)) => {
                info!("friend list of {steam_id} is private; keeping cached friends");
                return Ok(self.store.library(steam_id)?.friends.len());
            }
            Err(err) => return Err(err).context("failed to fetch friend list"),
        };

        let ids: Vec<String> = friends.iter().map(|f| f.steam_id.clone()).collect();
        let now = Utc::now();
        for batch in ids.chunks(SUMMARY_BATCH) {
            match self.client.player_summaries(batch).await {
                Ok(summaries) => {
                    for summary in summaries {
                        self.store.upsert_profile(summary.into_profile(now))?;
                    }
                }
                Err(err) => warn!("friend profile lookup failed: {err}"),
            }
        }

        let count = friends.len();
        self.store.replace_friends(steam_id, friends)?;
        Ok(count)
    }

    /// Attach achievement progress and rarest unlocks to the most-played games.
    ///
    /// Disabled unless `sync_achievements` is set. Games without stats and
    /// per-game failures are skipped.
    pub async fn sync_achievements(&self, steam_id: &str) -> Result<usize> {
        if !self.config.sync_achievements {
            return Ok(0);
        }

        let candidates =
            achievement_candidates(self.store.games(steam_id)?, self.config.achievement_sync_limit);
        let mut enriched = 0;
        for mut game in candidates {
            let Some(app_id) = game.app_id else { continue };
            let achievements = match self.client.player_achievements(steam_id, app_id).await {
                Ok(list) if !list.is_empty() => list,
                Ok(_) => continue,
                Err(err) => {
                    warn!("achievements for app {app_id} unavailable: {err}");
                    continue;
                }
            };

            let (unlocked, total) = achievement_progress(&achievements);
            game.achievements_unlocked = Some(unlocked);
            game.achievements_total = Some(total);
            self.store.upsert_games(steam_id, [game])?;

            match self.client.global_achievement_percentages(app_id).await {
                Ok(global) => {
                    if let Some(rarest) = rarest_unlocked(&achievements, &global) {
                        self.store.set_rarity(steam_id, app_id, rarest)?;
                    }
                }
                Err(err) => warn!("global percentages for app {app_id} unavailable: {err}"),
            }
            enriched += 1;
        }
        Ok(enriched)
    }
}

/// Convert owned entries to records, taking two-week playtime from the
/// recently-played list when the owned entry leaves it out.
pub fn merge_recent_playtime(
    owned: Vec<SteamOwnedGame>,
    recent: &[SteamRecentGame],
) -> Vec<OwnedGameRecord> {
    let recent: HashMap<u32, u64> = recent
        .iter()
        .map(|game| (game.appid, game.playtime_2weeks))
        .collect();

    owned
        .into_iter()
        .map(|game| {
            let fallback = game.appid.and_then(|id| recent.get(&id).copied());
            let missing_recent = game.playtime_2weeks.is_none();
            let mut record = OwnedGameRecord::from(game);
            if missing_recent {
                record.recent_playtime_minutes = fallback.unwrap_or(0);
            }
            record
        })
        .collect()
}

fn achievement_candidates(mut games: Vec<OwnedGameRecord>, limit: usize) -> Vec<OwnedGameRecord> {
    games.retain(|game| game.app_id.is_some() && game.total_playtime_minutes > 0);
    games.sort_by(|a, b| b.total_playtime_minutes.cmp(&a.total_playtime_minutes));
    games.truncate(limit);
    games
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;

    fn offline_sync(root: &std::path::Path, config: AppConfig) -> Result<LibrarySync> {
        // nothing listens on the discard port
        let client = SteamClient::new("test-key")?.with_base_url("http://127.0.0.1:9");
        Ok(LibrarySync::new(config, client, LibraryStore::new(root)))
    }

    #[test]
    fn recent_playtime_falls_back_to_recently_played() {
        let owned = vec![
            SteamOwnedGame {
                appid: Some(730),
                name: Some("Counter-Strike 2".to_string()),
                playtime_forever: 24_000,
                playtime_2weeks: None,
                ..SteamOwnedGame::default()
            },
            SteamOwnedGame {
                appid: Some(620),
                name: Some("Portal 2".to_string()),
                playtime_forever: 95,
                playtime_2weeks: Some(5),
                ..SteamOwnedGame::default()
            },
            SteamOwnedGame {
                appid: Some(570),
                playtime_forever: 0,
                ..SteamOwnedGame::default()
            },
        ];
        let recent = vec![
            SteamRecentGame {
                appid: 730,
                playtime_2weeks: 900,
                ..SteamRecentGame::default()
            },
            SteamRecentGame {
                appid: 620,
                playtime_2weeks: 40,
                ..SteamRecentGame::default()
            },
        ];

        let records = merge_recent_playtime(owned, &recent);
        assert_eq!(records[0].recent_playtime_minutes, 900);
        // the owned entry's own value wins when present
        assert_eq!(records[1].recent_playtime_minutes, 5);
        assert_eq!(records[2].recent_playtime_minutes, 0);
    }

    #[test]
    fn achievement_candidates_are_the_most_played() {
        let games = vec![
            OwnedGameRecord::new(1, "Small", 10, 0),
            OwnedGameRecord::new(2, "Never", 0, 0),
            OwnedGameRecord::new(3, "Big", 5_000, 0),
            OwnedGameRecord::new(4, "Mid", 300, 0),
        ];
        let ids: Vec<Option<u32>> = achievement_candidates(games, 2)
            .iter()
            .map(|game| game.app_id)
            .collect();
        assert_eq!(ids, vec![Some(3), Some(4)]);
    }

    #[test]
    fn prepare_reads_the_cache_without_network() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sync = offline_sync(dir.path(), AppConfig::default())?;
        demo::seed_store(sync.store())?;

        let library = sync.prepare(demo::DEMO_STEAM_ID)?;
        assert_eq!(library.games.len(), demo::games().len());
        assert!(sync.prepare("not-an-id").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn achievements_are_skipped_when_disabled() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sync = offline_sync(dir.path(), AppConfig::default())?;
        demo::seed_store(sync.store())?;
        assert_eq!(sync.sync_achievements(demo::DEMO_STEAM_ID).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn private_friend_list_keeps_cached_friends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = crate::steam::stub_server::respond_with("HTTP/1.1 401 Unauthorized", 1)?;
        let client = SteamClient::new("test-key")?.with_base_url(base);
        let sync = LibrarySync::new(AppConfig::default(), client, LibraryStore::new(dir.path()));
        demo::seed_store(sync.store())?;
        let before = sync.store().library(demo::DEMO_STEAM_ID)?.friends;
        assert!(!before.is_empty());

        assert_eq!(sync.sync_friends(demo::DEMO_STEAM_ID).await?, before.len());
        assert_eq!(sync.store().library(demo::DEMO_STEAM_ID)?.friends, before);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_api_reports_an_error_event() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sync = offline_sync(dir.path(), AppConfig::default())?;
        let (sender, mut receiver) = mpsc::channel(4);

        sync.run(demo::DEMO_STEAM_ID.to_string(), sender).await?;
        match receiver.recv().await {
            Some(SyncEvent::Error(_)) => Ok(()),
            other => anyhow::bail!("expected an error event, got {other:?}"),
        }
    }
}
