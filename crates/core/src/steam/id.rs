use once_cell::sync::Lazy;
use regex::Regex;

use super::SteamError;

static STEAM_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^7656119\d{10}$").expect("invalid steam id regex"));

static PROFILE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://steamcommunity\.com/(?:openid/id|profiles)/(7656119\d{10})/?$")
        .expect("invalid profile url regex")
});

/// Read a SteamID64 from a bare id, an OpenID claimed id or a profile URL.
pub fn parse_steam_id(input: &str) -> Result<String, SteamError> {
    let input = input.trim();
    if STEAM_ID.is_match(input) {
        return Ok(input.to_string());
    }
    PROFILE_URL
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or_else(|| SteamError::InvalidSteamId(input.to_string()))
}
