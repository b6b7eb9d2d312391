//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::{dto::parse_system_time, state::session::MAX_PLAYERS_PER_TEAM};

/// Validates a team roster: at most three players, each with a non-blank id.
///
/// # Examples
///
/// ```ignore
/// validate_roster(&["ana".into(), "beto".into()]) // Ok
/// validate_roster(&["".into()])                    // Err - blank id
/// ```
pub fn validate_roster(players: &[String]) -> Result<(), ValidationError> {
    if players.len() > MAX_PLAYERS_PER_TEAM {
        let mut err = ValidationError::new("roster_length");
        err.message = Some(
            format!(
                "A team has at most {MAX_PLAYERS_PER_TEAM} players (got {})",
                players.len()
            )
            .into(),
        );
        return Err(err);
    }

    if players.iter().any(|id| id.trim().is_empty()) {
        let mut err = ValidationError::new("roster_blank_id");
        err.message = Some("Player ids must not be blank".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a date is an RFC 3339 timestamp.
pub fn validate_rfc3339(value: &str) -> Result<(), ValidationError> {
    if parse_system_time(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("date_format");
    err.message = Some("Date must be an RFC 3339 timestamp".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_validate_roster_valid() {
        assert!(validate_roster(&[]).is_ok());
        assert!(validate_roster(&roster(&["ana", "beto", "caro"])).is_ok());
    }

    #[test]
    fn test_validate_roster_invalid() {
        assert!(validate_roster(&roster(&["a", "b", "c", "d"])).is_err()); // too many
        assert!(validate_roster(&roster(&["ana", " "])).is_err()); // blank
    }

    #[test]
    fn test_validate_rfc3339() {
        assert!(validate_rfc3339("2024-03-01T20:30:00-03:00").is_ok());
        assert!(validate_rfc3339("01/03/2024").is_err());
    }
}
