//! Shared domain models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rarest unlocked achievement per app id, attached during enrichment.
pub type RarityIndex = HashMap<u32, RarestAchievement>;

/// One game in a user's library as cached from Steam.
///
/// `app_id` stays optional so a malformed entry survives deserialisation and
/// can be rejected where identity matters. The playtime fields default to
/// zero and `name` to an empty string when Steam omits them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedGameRecord {
    /// Steam application id.
    #[serde(default)]
    pub app_id: Option<u32>,
    /// Store name of the game.
    #[serde(default)]
    pub name: String,
    /// Icon hash used to build the CDN icon URL.
    #[serde(default)]
    pub icon_id: Option<String>,
    /// Lifetime playtime in minutes.
    #[serde(default)]
    pub total_playtime_minutes: u64,
    /// Playtime over the last two weeks in minutes.
    #[serde(default)]
    pub recent_playtime_minutes: u64,
    /// Unix timestamp of the last session, if the game was ever played.
    #[serde(default)]
    pub last_played_epoch_seconds: Option<i64>,
    /// Achievements unlocked by the owner.
    #[serde(default)]
    pub achievements_unlocked: Option<u32>,
    /// Achievements available in the game.
    #[serde(default)]
    pub achievements_total: Option<u32>,
    /// Primary genre, when known.
    #[serde(default)]
    pub genre: Option<String>,
}

impl OwnedGameRecord {
    /// Minimal record with identity, name and playtimes.
    pub fn new(
        app_id: u32,
        name: impl Into<String>,
        total_minutes: u64,
        recent_minutes: u64,
    ) -> Self {
        Self {
            app_id: Some(app_id),
            name: name.into(),
            total_playtime_minutes: total_minutes,
            recent_playtime_minutes: recent_minutes,
            ..Self::default()
        }
    }

    /// Lifetime playtime in hours.
    pub fn total_hours(&self) -> f64 {
        self.total_playtime_minutes as f64 / 60.0
    }

    /// Playtime over the last two weeks, in hours.
    pub fn recent_hours(&self) -> f64 {
        self.recent_playtime_minutes as f64 / 60.0
    }

    /// Name to show, falling back to the app id for unnamed entries.
    pub fn display_name(&self) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        match self.app_id {
            Some(id) => format!("App {id}"),
            None => "Unknown game".to_string(),
        }
    }

    /// Merge a fresher record for the same app into this cached one.
    ///
    /// Playtime and presentation fields are replaced; enrichment fields the
    /// update leaves empty keep their cached values.
    pub fn merge_from(&mut self, update: OwnedGameRecord) {
        self.name = update.name;
        self.icon_id = update.icon_id;
        self.total_playtime_minutes = update.total_playtime_minutes;
        self.recent_playtime_minutes = update.recent_playtime_minutes;
        self.last_played_epoch_seconds = update.last_played_epoch_seconds;
        if update.genre.is_some() {
            self.genre = update.genre;
        }
        if update.achievements_unlocked.is_some() {
            self.achievements_unlocked = update.achievements_unlocked;
        }
        if update.achievements_total.is_some() {
            self.achievements_total = update.achievements_total;
        }
    }
}

/// Rarest achievement a player holds for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarestAchievement {
    /// Display or API name of the achievement.
    pub name: String,
    /// Global unlock percentage.
    pub percent: f64,
}

impl Default for RarestAchievement {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            percent: 0.0,
        }
    }
}

/// Achievement progress attached to a graph node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AchievementSummary {
    /// Unlocked achievements.
    pub unlocked: u32,
    /// Total achievements.
    pub total: u32,
    /// Rarest unlocked achievement.
    pub rarest: RarestAchievement,
}

impl AchievementSummary {
    /// Completion ratio in `[0, 1]`, zero when the game has no achievements.
    pub fn completion(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.unlocked as f64 / self.total as f64).min(1.0)
        }
    }
}

/// Render-ready descriptor of one owned game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// App id of the game.
    pub id: u32,
    /// Game name.
    pub name: String,
    /// Lifetime playtime in hours.
    pub playtime_hours: f64,
    /// Playtime over the last two weeks in hours.
    pub recent_hours: f64,
    /// Genre, `"Unknown"` when not cached.
    pub genre: String,
    /// `"Never"` or an RFC 3339 timestamp of the last session.
    pub last_played_label: String,
    /// Achievement progress.
    pub achievements: AchievementSummary,
    /// Rank against the most-played game of the batch; 0 is the top.
    pub top_percentile_rank: u8,
    /// Deterministic colour token derived from the app id.
    pub color: String,
    /// CDN icon URL or an empty string.
    pub icon_url: String,
}

/// Public profile data cached for a Steam user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    /// SteamID64.
    pub steam_id: String,
    /// Display name.
    pub persona_name: String,
    /// Full-size avatar URL.
    pub avatar_url: String,
    /// Community visibility state (1 private, 3 public).
    pub visibility: Option<u8>,
    /// Online state code.
    pub persona_state: Option<u8>,
    /// Last log-off as Unix seconds.
    pub last_logoff: Option<i64>,
    /// Account creation as Unix seconds.
    pub time_created: Option<i64>,
    /// ISO country code.
    pub country_code: Option<String>,
    /// When this profile was last refreshed from Steam.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl PlayerProfile {
    /// Persona name, or the id when the profile was never fetched.
    pub fn display_name(&self) -> &str {
        if self.persona_name.is_empty() {
            &self.steam_id
        } else {
            &self.persona_name
        }
    }
}

/// Friend relation as returned by Steam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEntry {
    /// SteamID64 of the friend.
    pub steam_id: String,
    /// Unix timestamp of when the friendship started.
    #[serde(default)]
    pub friend_since: Option<i64>,
}

/// Everything cached for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLibrary {
    /// SteamID64 of the owner.
    pub steam_id: String,
    /// Cached profile, if synced.
    #[serde(default)]
    pub profile: Option<PlayerProfile>,
    /// Owned games keyed by app id within this document.
    #[serde(default)]
    pub games: Vec<OwnedGameRecord>,
    /// Friend list.
    #[serde(default)]
    pub friends: Vec<FriendEntry>,
    /// Rarest-achievement enrichment per app.
    #[serde(default)]
    pub rarity: RarityIndex,
    /// Completion time of the last full sync.
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl UserLibrary {
    /// Empty library for a user.
    pub fn new(steam_id: impl Into<String>) -> Self {
        Self {
            steam_id: steam_id.into(),
            ..Self::default()
        }
    }

    /// Name used in headings.
    pub fn owner_name(&self) -> String {
        self.profile
            .as_ref()
            .map(|profile| profile.display_name().to_string())
            .unwrap_or_else(|| self.steam_id.clone())
    }
}

/// Label for a Steam persona state code.
pub fn persona_state_label(state: Option<u8>) -> &'static str {
    match state {
        Some(0) => "Offline",
        Some(1) => "Online",
        Some(2) => "Busy",
        Some(3) => "Away",
        Some(4) => "Snooze",
        Some(5) => "Looking to Trade",
        Some(6) => "Looking to Play",
        _ => "Unknown",
    }
}

/// Label for a community visibility state code.
pub fn visibility_label(visibility: Option<u8>) -> &'static str {
    match visibility {
        Some(3) => "Public",
        Some(1) => "Private",
        _ => "Unknown",
    }
}
