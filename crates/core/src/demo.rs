//! Bundled sample account used when no Steam credentials are configured.

use anyhow::Result;

use crate::{
    models::{
        FriendEntry, OwnedGameRecord, PlayerProfile, RarestAchievement, RarityIndex, UserLibrary,
    },
    store::LibraryStore,
};

/// SteamID64 of the demo account.
pub const DEMO_STEAM_ID: &str = "76561198000000001";
/// SteamID64 of the demo account's friend.
pub const DEMO_FRIEND_ID: &str = "76561198000000002";

const LAST_LOGOFF: i64 = 1_706_661_200;

/// Profile of the demo account.
pub fn profile() -> PlayerProfile {
    PlayerProfile {
        steam_id: DEMO_STEAM_ID.to_string(),
        persona_name: "ghost_runner".to_string(),
        avatar_url: "/ghostpfp.jpg".to_string(),
        visibility: Some(3),
        persona_state: Some(3),
        last_logoff: Some(LAST_LOGOFF),
        time_created: Some(1_508_451_200),
        country_code: Some("US".to_string()),
        last_sync_at: None,
    }
}

fn game(
    app_id: u32,
    name: &str,
    total_minutes: u64,
    recent_minutes: u64,
    genre: &str,
    last_played_days_ago: Option<i64>,
) -> OwnedGameRecord {
    OwnedGameRecord {
        genre: Some(genre.to_string()),
        last_played_epoch_seconds: last_played_days_ago.map(|days| LAST_LOGOFF - days * 86_400),
        ..OwnedGameRecord::new(app_id, name, total_minutes, recent_minutes)
    }
}

fn with_achievements(mut record: OwnedGameRecord, unlocked: u32, total: u32) -> OwnedGameRecord {
    record.achievements_unlocked = Some(unlocked);
    record.achievements_total = Some(total);
    record
}

/// Owned games of the demo account.
pub fn games() -> Vec<OwnedGameRecord> {
    vec![
        with_achievements(game(730, "Counter-Strike 2", 24_000, 900, "Shooter", Some(0)), 1, 1),
        with_achievements(
            game(1_245_620, "Elden Ring", 18_720, 0, "Action RPG", Some(40)),
            31,
            42,
        ),
        with_achievements(game(1_145_360, "Hades", 5_400, 120, "Roguelike", Some(3)), 27, 49),
        with_achievements(
            game(1_086_940, "Baldur's Gate 3", 11_184, 0, "RPG", Some(75)),
            22,
            54,
        ),
        game(620, "Portal 2", 95, 0, "Puzzle", Some(400)),
        game(252_950, "Rocket League", 210, 0, "Sports", Some(220)),
        OwnedGameRecord {
            genre: Some("MOBA".to_string()),
            ..OwnedGameRecord::new(570, "Dota 2", 0, 0)
        },
        game(271_590, "GTA V", 45, 0, "Action", Some(610)),
        game(1_091_500, "Cyberpunk 2077", 800, 0, "RPG", Some(150)),
        game(377_160, "Fallout 4", 1_200, 0, "RPG", Some(300)),
    ]
}

/// Rarest unlocked achievements for the demo account's finished runs.
pub fn rarity() -> RarityIndex {
    [
        (1_245_620, "Elden Lord", 31.6),
        (1_145_360, "Is There No Escape?", 4.9),
        (1_086_940, "Foehammer", 8.2),
    ]
    .into_iter()
    .map(|(app_id, name, percent)| {
        (
            app_id,
            RarestAchievement {
                name: name.to_string(),
                percent,
            },
        )
    })
    .collect()
}

/// Profile of the demo friend.
pub fn friend_profile() -> PlayerProfile {
    PlayerProfile {
        steam_id: DEMO_FRIEND_ID.to_string(),
        persona_name: "lantern_moth".to_string(),
        visibility: Some(3),
        persona_state: Some(1),
        country_code: Some("CA".to_string()),
        ..PlayerProfile::default()
    }
}

/// Owned games of the demo friend.
pub fn friend_games() -> Vec<OwnedGameRecord> {
    vec![
        OwnedGameRecord::new(730, "Counter-Strike 2", 12_345, 300),
        OwnedGameRecord::new(570, "Dota 2", 8_040, 0),
        OwnedGameRecord::new(440, "Team Fortress 2", 2_400, 0),
        OwnedGameRecord::new(271_590, "GTA V", 1_800, 0),
        OwnedGameRecord::new(1_091_500, "Cyberpunk 2077", 920, 60),
        OwnedGameRecord::new(945_360, "Among Us", 260, 0),
    ]
}

/// The demo account as a single library document.
pub fn library() -> UserLibrary {
    UserLibrary {
        profile: Some(profile()),
        games: games(),
        friends: vec![FriendEntry {
            steam_id: DEMO_FRIEND_ID.to_string(),
            friend_since: Some(1_600_000_000),
        }],
        rarity: rarity(),
        ..UserLibrary::new(DEMO_STEAM_ID)
    }
}

/// Write the demo account and its friend into `store`.
pub fn seed_store(store: &LibraryStore) -> Result<()> {
    let library = library();
    store.upsert_profile(profile())?;
    store.upsert_games(DEMO_STEAM_ID, library.games)?;
    store.replace_friends(DEMO_STEAM_ID, library.friends)?;
    for (app_id, rarest) in library.rarity {
        store.set_rarity(DEMO_STEAM_ID, app_id, rarest)?;
    }

    store.upsert_profile(friend_profile())?;
    store.upsert_games(DEMO_FRIEND_ID, friend_games())?;
    Ok(())
}
