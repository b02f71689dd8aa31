use crate::error::AppError;
use crate::models::league::{LeagueEntry, RiotId};
use serde_json::Value;

const MAX_REGION_CODE_LEN: usize = 8;

pub fn validate_region_code(code: &str) -> Result<(), AppError> {
    let valid = !code.is_empty()
        && code.len() <= MAX_REGION_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid region code: {}", code)))
    }
}

/// Splits `<year>_<sequence>` into its parts. Anything else is not an
/// archive produced by this tool.
pub fn parse_archive_name(name: &str) -> Option<(i32, u32)> {
    let (year, seq) = name.split_once('_')?;
    if year.len() != 4 || seq.is_empty() || !seq.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, seq.parse().ok()?))
}

pub fn validate_archive_name(name: &str) -> Result<(i32, u32), AppError> {
    parse_archive_name(name)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid archive name: {}", name)))
}

pub fn validate_league_entry(raw: &Value) -> Result<LeagueEntry, AppError> {
    let entry: LeagueEntry = serde_json::from_value(raw.clone())
        .map_err(|e| AppError::MalformedEntry(e.to_string()))?;
    if entry.puuid.trim().is_empty() {
        return Err(AppError::MalformedEntry("empty puuid".into()));
    }
    Ok(entry)
}

/// Trims an account name; blank parts fall back to the unknown sentinel.
pub fn sanitize_riot_id(id: RiotId) -> RiotId {
    let unknown = RiotId::unknown();
    let game_name = id.game_name.trim();
    let tag_line = id.tag_line.trim();
    RiotId {
        game_name: if game_name.is_empty() {
            unknown.game_name
        } else {
            game_name.to_string()
        },
        tag_line: if tag_line.is_empty() {
            unknown.tag_line
        } else {
            tag_line.to_string()
        },
    }
}
