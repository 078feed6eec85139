#![allow(missing_docs)]

//! Payload shapes returned by the Steam Web API.
//!
//! Steam omits sections freely (private profiles, apps without stats), so
//! every envelope defaults to empty instead of failing to decode.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer};

use crate::models::{FriendEntry, OwnedGameRecord, PlayerProfile, RarestAchievement};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesResponse {
    #[serde(default)]
    pub response: OwnedGamesBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnedGamesBody {
    #[serde(default)]
    pub game_count: Option<u32>,
    #[serde(default)]
    pub games: Vec<SteamOwnedGame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamOwnedGame {
    #[serde(default)]
    pub appid: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub img_icon_url: Option<String>,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub playtime_2weeks: Option<u64>,
    #[serde(default)]
    pub rtime_last_played: Option<i64>,
}

impl From<SteamOwnedGame> for OwnedGameRecord {
    fn from(game: SteamOwnedGame) -> Self {
        OwnedGameRecord {
            app_id: game.appid,
            name: game.name.unwrap_or_default(),
            icon_id: game.img_icon_url.filter(|icon| !icon.is_empty()),
            total_playtime_minutes: game.playtime_forever,
            recent_playtime_minutes: game.playtime_2weeks.unwrap_or(0),
            // 0 is Steam's marker for "never launched"
            last_played_epoch_seconds: game.rtime_last_played.filter(|secs| *secs > 0),
            achievements_unlocked: None,
            achievements_total: None,
            genre: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default)]
    pub response: RecentlyPlayedBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentlyPlayedBody {
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub games: Vec<SteamRecentGame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamRecentGame {
    pub appid: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playtime_2weeks: u64,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default)]
    pub img_icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummariesResponse {
    #[serde(default)]
    pub response: PlayerSummariesBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummariesBody {
    #[serde(default)]
    pub players: Vec<SteamPlayerSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamPlayerSummary {
    pub steamid: String,
    #[serde(default)]
    pub personaname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub avatarfull: String,
    #[serde(default)]
    pub communityvisibilitystate: Option<u8>,
    #[serde(default)]
    pub personastate: Option<u8>,
    #[serde(default)]
    pub lastlogoff: Option<i64>,
    #[serde(default)]
    pub timecreated: Option<i64>,
    #[serde(default)]
    pub loccountrycode: Option<String>,
}

impl SteamPlayerSummary {
    pub fn into_profile(self, synced_at: DateTime<Utc>) -> PlayerProfile {
        let avatar_url = if self.avatarfull.is_empty() {
            self.avatar
        } else {
            self.avatarfull
        };
        PlayerProfile {
            steam_id: self.steamid,
            persona_name: self.personaname,
            avatar_url,
            visibility: self.communityvisibilitystate,
            persona_state: self.personastate,
            last_logoff: self.lastlogoff,
            time_created: self.timecreated,
            country_code: self.loccountrycode,
            last_sync_at: Some(synced_at),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendListResponse {
    #[serde(default)]
    pub friendslist: FriendListBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendListBody {
    #[serde(default)]
    pub friends: Vec<SteamFriend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamFriend {
    pub steamid: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub friend_since: Option<i64>,
}

impl From<SteamFriend> for FriendEntry {
    fn from(friend: SteamFriend) -> Self {
        FriendEntry {
            steam_id: friend.steamid,
            friend_since: friend.friend_since,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerAchievementsResponse {
    #[serde(default)]
    pub playerstats: PlayerStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerStats {
    #[serde(default, rename = "gameName")]
    pub game_name: Option<String>,
    #[serde(default)]
    pub achievements: Vec<SteamPlayerAchievement>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SteamPlayerAchievement {
    pub apiname: String,
    #[serde(default)]
    pub achieved: u8,
    #[serde(default)]
    pub unlocktime: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

impl SteamPlayerAchievement {
    pub fn is_unlocked(&self) -> bool {
        self.achieved > 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalAchievementsResponse {
    #[serde(default)]
    pub achievementpercentages: GlobalAchievementsBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalAchievementsBody {
    #[serde(default)]
    pub achievements: Vec<GlobalAchievementPercent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalAchievementPercent {
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub percent: f64,
}

/// Unlocked and total counts for a player's achievement list.
pub fn achievement_progress(achievements: &[SteamPlayerAchievement]) -> (u32, u32) {
    let unlocked = achievements.iter().filter(|a| a.is_unlocked()).count();
    (unlocked as u32, achievements.len() as u32)
}

/// The unlocked achievement with the lowest global unlock rate.
pub fn rarest_unlocked(
    player: &[SteamPlayerAchievement],
    global: &[GlobalAchievementPercent],
) -> Option<RarestAchievement> {
    let rates: HashMap<&str, f64> = global
        .iter()
        .map(|entry| (entry.name.as_str(), entry.percent))
        .collect();

    player
        .iter()
        .filter(|achievement| achievement.is_unlocked())
        .filter_map(|achievement| {
            rates
                .get(achievement.apiname.as_str())
                .map(|percent| (achievement, *percent))
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(achievement, percent)| RarestAchievement {
            name: achievement
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| achievement.apiname.clone()),
            percent,
        })
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid percentage '{text}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_games_payload_converts_to_records() -> serde_json::Result<()> {
        let payload: OwnedGamesResponse = serde_json::from_str(
            r#"{"response": {"game_count": 3, "games": [
                {"appid": 730, "name": "Counter-Strike 2", "playtime_forever": 24000,
                 "playtime_2weeks": 900, "img_icon_url": "8dbc71957312", "rtime_last_played": 1706661200},
                {"appid": 570, "name": "Dota 2", "playtime_forever": 0, "img_icon_url": "",
                 "rtime_last_played": 0},
                {"name": "No id", "playtime_forever": 5}
            ]}}"#,
        )?;
        assert_eq!(payload.response.game_count, Some(3));

        let records: Vec<OwnedGameRecord> =
            payload.response.games.into_iter().map(Into::into).collect();
        assert_eq!(records[0].app_id, Some(730));
        assert_eq!(records[0].recent_playtime_minutes, 900);
        assert_eq!(records[0].icon_id.as_deref(), Some("8dbc71957312"));
        assert_eq!(records[0].last_played_epoch_seconds, Some(1_706_661_200));
        assert_eq!(records[1].icon_id, None);
        assert_eq!(records[1].last_played_epoch_seconds, None);
        assert_eq!(records[1].recent_playtime_minutes, 0);
        assert_eq!(records[2].app_id, None);
        Ok(())
    }

    #[test]
    fn missing_sections_decode_as_empty() -> serde_json::Result<()> {
        let owned: OwnedGamesResponse = serde_json::from_str(r#"{"response": {}}"#)?;
        assert!(owned.response.games.is_empty());
        let friends: FriendListResponse = serde_json::from_str("{}")?;
        assert!(friends.friendslist.friends.is_empty());
        let stats: PlayerAchievementsResponse = serde_json::from_str(
            r#"{"playerstats": {"error": "Requested app has no stats", "success": false}}"#,
        )?;
        assert!(stats.playerstats.achievements.is_empty());
        assert!(!stats.playerstats.success);
        Ok(())
    }

    #[test]
    fn summary_prefers_full_avatar() -> serde_json::Result<()> {
        let payload: PlayerSummariesResponse = serde_json::from_str(
            r#"{"response": {"players": [{
                "steamid": "76561198000000001", "personaname": "ghost_runner",
                "avatar": "small.jpg", "avatarfull": "full.jpg",
                "communityvisibilitystate": 3, "personastate": 1, "loccountrycode": "US"
            }]}}"#,
        )?;
        let summary = payload.response.players.into_iter().next().unwrap_or_default();
        let profile = summary.into_profile(Utc::now());
        assert_eq!(profile.persona_name, "ghost_runner");
        assert_eq!(profile.avatar_url, "full.jpg");
        assert_eq!(profile.visibility, Some(3));
        assert!(profile.last_sync_at.is_some());
        Ok(())
    }

    #[test]
    fn rarest_unlocked_picks_lowest_global_rate() -> serde_json::Result<()> {
        let player: PlayerAchievementsResponse = serde_json::from_str(
            r#"{"playerstats": {"success": true, "achievements": [
                {"apiname": "FIRST_BLOOD", "achieved": 1, "name": "First Blood"},
                {"apiname": "GODLIKE", "achieved": 1},
                {"apiname": "IMPOSSIBLE", "achieved": 0}
            ]}}"#,
        )?;
        let global: GlobalAchievementsResponse = serde_json::from_str(
            r#"{"achievementpercentages": {"achievements": [
                {"name": "FIRST_BLOOD", "percent": 87.5},
                {"name": "GODLIKE", "percent": "4.2"},
                {"name": "IMPOSSIBLE", "percent": 0.1}
            ]}}"#,
        )?;

        let achievements = &player.playerstats.achievements;
        assert_eq!(achievement_progress(achievements), (2, 3));

        let rarest = rarest_unlocked(achievements, &global.achievementpercentages.achievements);
        assert_eq!(
            rarest,
            Some(RarestAchievement {
                name: "GODLIKE".to_string(),
                percent: 4.2,
            })
        );
        assert_eq!(rarest_unlocked(&[], &global.achievementpercentages.achievements), None);
        Ok(())
    }
}
