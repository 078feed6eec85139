//! File-backed cache of user libraries.
//!
//! One JSON document per user holds the profile, owned games, friends and
//! achievement enrichment. Games are keyed by app id within a document, so
//! `(user, app id)` is the upsert key.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    models::{
        FriendEntry, OwnedGameRecord, PlayerProfile, RarestAchievement, RarityIndex, UserLibrary,
    },
};

/// Directory under the cache root holding library documents.
pub const LIBRARY_DIR: &str = "library";

/// Counts reported by [`LibraryStore::upsert_games`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertSummary {
    /// Records added for the first time.
    pub inserted: usize,
    /// Records merged into an existing entry.
    pub updated: usize,
    /// Records rejected for lacking an app id.
    pub skipped: usize,
}

/// Thread-safe store of [`UserLibrary`] documents.
#[derive(Clone)]
pub struct LibraryStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    root: PathBuf,
    cache: HashMap<String, UserLibrary>,
}

impl LibraryStore {
    /// Create a store rooted at `root`; nothing is read until first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                root: root.into(),
                cache: HashMap::new(),
            })),
        }
    }

    /// Store under the configured cache root.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cache_root.join(LIBRARY_DIR))
    }

    /// Directory holding the documents.
    pub fn root(&self) -> PathBuf {
        self.inner.read().root.clone()
    }

    /// Full cached library for a user; empty when never synced.
    pub fn library(&self, steam_id: &str) -> Result<UserLibrary> {
        if let Some(library) = self.inner.read().cache.get(steam_id) {
            return Ok(library.clone());
        }
        let mut inner = self.inner.write();
        Ok(inner.load(steam_id)?.clone())
    }

    /// All owned-game records cached for a user.
    pub fn games(&self, steam_id: &str) -> Result<Vec<OwnedGameRecord>> {
        Ok(self.library(steam_id)?.games)
    }

    /// Insert or update games by app id and persist the document.
    pub fn upsert_games(
        &self,
        steam_id: &str,
        records: impl IntoIterator<Item = OwnedGameRecord>,
    ) -> Result<UpsertSummary> {
        self.update(steam_id, |library| {
            let mut summary = UpsertSummary::default();
            let mut index: HashMap<u32, usize> = library
                .games
                .iter()
                .enumerate()
                .filter_map(|(pos, game)| game.app_id.map(|id| (id, pos)))
                .collect();

            for record in records {
                let Some(app_id) = record.app_id else {
                    summary.skipped += 1;
                    continue;
                };
                match index.get(&app_id) {
                    Some(&pos) => {
                        library.games[pos].merge_from(record);
                        summary.updated += 1;
                    }
                    None => {
                        index.insert(app_id, library.games.len());
                        library.games.push(record);
                        summary.inserted += 1;
                    }
                }
            }
            summary
        })
    }

    /// Insert or replace the profile of its owner.
    pub fn upsert_profile(&self, profile: PlayerProfile) -> Result<()> {
        let steam_id = profile.steam_id.clone();
        self.update(&steam_id, |library| library.profile = Some(profile))
    }

    /// Replace the friend list of a user.
    pub fn replace_friends(&self, steam_id: &str, friends: Vec<FriendEntry>) -> Result<()> {
        self.update(steam_id, |library| library.friends = friends)
    }

    /// Record the rarest unlocked achievement for one game.
    pub fn set_rarity(
        &self,
        steam_id: &str,
        app_id: u32,
        rarest: RarestAchievement,
    ) -> Result<()> {
        self.update(steam_id, |library| {
            library.rarity.insert(app_id, rarest);
        })
    }

    /// Rarest-achievement enrichment for a user.
    pub fn rarity(&self, steam_id: &str) -> Result<RarityIndex> {
        Ok(self.library(steam_id)?.rarity)
    }

    /// Stamp the time of a completed sync.
    pub fn mark_synced(&self, steam_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(steam_id, |library| library.last_sync_at = Some(at))
    }

    /// Ids of every user with a document on disk.
    pub fn users(&self) -> Result<Vec<String>> {
        let root = self.root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut users = Vec::new();
        for entry in fs::read_dir(&root)
            .with_context(|| format!("failed to read {}", root.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_library(&path) {
                Ok(Some(library)) => users.push(library.steam_id),
                Ok(None) => {}
                Err(err) => warn!("Failed to read library {:?}: {err}", path),
            }
        }
        users.sort();
        Ok(users)
    }

    fn update<R>(&self, steam_id: &str, apply: impl FnOnce(&mut UserLibrary) -> R) -> Result<R> {
        let mut inner = self.inner.write();
        let path = library_path(&inner.root, steam_id);
        // the cache only takes the change once it is on disk
        let mut library = inner.load(steam_id)?.clone();
        let result = apply(&mut library);
        write_library(&path, &library)?;
        debug!(steam_id, games = library.games.len(), "library persisted");
        inner.cache.insert(steam_id.to_string(), library);
        Ok(result)
    }
}

impl Inner {
    fn load(&mut self, steam_id: &str) -> Result<&mut UserLibrary> {
        if !self.cache.contains_key(steam_id) {
            let library = read_library(&library_path(&self.root, steam_id))?
                .unwrap_or_else(|| UserLibrary::new(steam_id));
            self.cache.insert(steam_id.to_string(), library);
        }
        self.cache
            .get_mut(steam_id)
            .context("library cache entry vanished")
    }
}

fn library_path(root: &Path, steam_id: &str) -> PathBuf {
    root.join(format!("{}.json", sanitize_component(steam_id)))
}

fn read_library(path: &Path) -> Result<Option<UserLibrary>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let library = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(library))
}

fn write_library(path: &Path, library: &UserLibrary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_vec_pretty(library)?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
}

/// Reduce an identifier to a safe file-name component.
pub fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "library".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const USER: &str = "76561198000000001";

    #[test]
    fn upsert_inserts_then_merges_by_app_id() -> Result<()> {
        let dir = tempdir()?;
        let store = LibraryStore::new(dir.path());

        let first = store.upsert_games(
            USER,
            vec![
                OwnedGameRecord::new(620, "Portal 2", 95, 0),
                OwnedGameRecord::new(730, "Counter-Strike 2", 24_000, 900),
                OwnedGameRecord::default(),
            ],
        )?;
        assert_eq!(
            first,
            UpsertSummary {
                inserted: 2,
                updated: 0,
                skipped: 1
            }
        );

        let second =
            store.upsert_games(USER, vec![OwnedGameRecord::new(620, "Portal 2", 140, 45)])?;
        assert_eq!(second.updated, 1);

        let games = store.games(USER)?;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].total_playtime_minutes, 140);
        assert_eq!(games[0].recent_playtime_minutes, 45);
        Ok(())
    }

    #[test]
    fn failed_write_leaves_the_cache_untouched() -> Result<()> {
        let dir = tempdir()?;
        // a regular file where the library directory should be
        let root = dir.path().join("library");
        fs::write(&root, b"not a directory")?;
        let store = LibraryStore::new(&root);

        let result = store.upsert_games(USER, vec![OwnedGameRecord::new(1, "A", 10, 0)]);
        assert!(result.is_err());
        assert!(store.games(USER)?.is_empty());
        assert!(store.set_rarity(USER, 1, RarestAchievement::default()).is_err());
        assert!(store.rarity(USER)?.is_empty());

        fs::remove_file(&root)?;
        assert!(LibraryStore::new(&root).games(USER)?.is_empty());
        store.upsert_games(USER, vec![OwnedGameRecord::new(2, "B", 20, 0)])?;
        assert_eq!(store.games(USER)?.len(), 1);
        Ok(())
    }

    #[test]
    fn documents_survive_a_fresh_store() -> Result<()> {
        let dir = tempdir()?;
        {
            let store = LibraryStore::new(dir.path());
            store.upsert_profile(PlayerProfile {
                steam_id: USER.to_string(),
                persona_name: "ghost_runner".to_string(),
                ..PlayerProfile::default()
            })?;
            store.upsert_games(USER, vec![OwnedGameRecord::new(570, "Dota 2", 0, 0)])?;
            store.replace_friends(
                USER,
                vec![FriendEntry {
                    steam_id: "76561198000000002".to_string(),
                    friend_since: Some(1_600_000_000),
                }],
            )?;
            store.set_rarity(
                USER,
                570,
                RarestAchievement {
                    name: "Rampage".to_string(),
                    percent: 1.2,
                },
            )?;
        }

        let reopened = LibraryStore::new(dir.path());
        let library = reopened.library(USER)?;
        assert_eq!(library.owner_name(), "ghost_runner");
        assert_eq!(library.games.len(), 1);
        assert_eq!(library.friends.len(), 1);
        assert_eq!(reopened.rarity(USER)?.get(&570).map(|r| r.percent), Some(1.2));
        assert_eq!(reopened.users()?, vec![USER.to_string()]);
        Ok(())
    }

    #[test]
    fn unknown_user_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = LibraryStore::new(dir.path().join("missing"));
        let library = store.library("123")?;
        assert_eq!(library.steam_id, "123");
        assert!(library.games.is_empty());
        assert!(store.users()?.is_empty());
        Ok(())
    }

    #[test]
    fn sanitize_strips_path_characters() {
        assert_eq!(sanitize_component("../7656/119"), "7656119");
        assert_eq!(sanitize_component("///"), "library");
    }
}
