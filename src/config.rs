//! Application-level configuration loading: match defaults, snapshot location
//! and the player directory seed.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dao::players::StaticPlayerDirectory, state::win_policy::TargetScore};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ANOTADOR_BACK_CONFIG_PATH";
/// Where the active match is kept between restarts.
const DEFAULT_SNAPSHOT_PATH: &str = "data/current_match.json";
/// Rotation window used when a client enables pica-pica without bounds.
const DEFAULT_ROTATION_WINDOW: RotationWindow = RotationWindow {
    start_at: 5,
    end_at: 25,
};

/// Inclusive score range of the pica-pica rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RotationWindow {
    /// First score inside the window.
    pub start_at: u32,
    /// Last score inside the window.
    pub end_at: u32,
}

/// Player entry seeding the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerEntry {
    /// Stable identifier referenced by team rosters.
    pub id: String,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_target_score: TargetScore,
    rotation_window: RotationWindow,
    snapshot_path: Option<PathBuf>,
    players: Vec<PlayerEntry>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        players = app_config.players.len(),
                        target = app_config.default_target_score.points(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Target score of a new match.
    pub fn default_target_score(&self) -> TargetScore {
        self.default_target_score
    }

    /// Window applied when rotation is enabled without explicit bounds.
    pub fn rotation_window(&self) -> RotationWindow {
        self.rotation_window
    }

    /// Location of the local snapshot, `None` when disabled.
    pub fn snapshot_path(&self) -> Option<&PathBuf> {
        self.snapshot_path.as_ref()
    }

    /// Same configuration without a local snapshot.
    pub fn without_snapshot(mut self) -> Self {
        self.snapshot_path = None;
        self
    }

    /// Build the player directory from the configured entries.
    pub fn player_directory(&self) -> StaticPlayerDirectory {
        StaticPlayerDirectory::new(
            self.players
                .iter()
                .map(|player| (player.id.clone(), player.name.clone())),
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_target_score: TargetScore::Thirty,
            rotation_window: DEFAULT_ROTATION_WINDOW,
            snapshot_path: Some(PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            players: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_target_score: Option<u32>,
    #[serde(default)]
    rotation_window: Option<RotationWindow>,
    /// Absent means the default path; an explicit `null` disables the snapshot.
    #[serde(default = "default_snapshot_path")]
    snapshot_path: Option<PathBuf>,
    #[serde(default)]
    players: Vec<PlayerEntry>,
}

fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_SNAPSHOT_PATH))
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let rotation_window = value
            .rotation_window
            .map(|window| RotationWindow {
                start_at: window.start_at.min(window.end_at),
                end_at: window.start_at.max(window.end_at),
            })
            .unwrap_or(DEFAULT_ROTATION_WINDOW);

        Self {
            default_target_score: value
                .default_target_score
                .map(TargetScore::coerce)
                .unwrap_or_default(),
            rotation_window,
            snapshot_path: value.snapshot_path,
            players: value.players,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::players::PlayerDirectory;

    fn parse(json: &str) -> AppConfig {
        serde_json::from_str::<RawConfig>(json).unwrap().into()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("{}");
        assert_eq!(config.default_target_score(), TargetScore::Thirty);
        assert_eq!(config.rotation_window(), DEFAULT_ROTATION_WINDOW);
        assert_eq!(
            config.snapshot_path(),
            Some(&PathBuf::from(DEFAULT_SNAPSHOT_PATH))
        );
    }

    #[test]
    fn target_is_coerced_and_window_reordered() {
        let config = parse(
            r#"{
                "default_target_score": 20,
                "rotation_window": { "start_at": 25, "end_at": 10 },
                "snapshot_path": null
            }"#,
        );
        assert_eq!(config.default_target_score(), TargetScore::Fifteen);
        assert_eq!(
            config.rotation_window(),
            RotationWindow {
                start_at: 10,
                end_at: 25
            }
        );
        assert!(config.snapshot_path().is_none());
    }

    #[test]
    fn players_seed_the_directory() {
        let config = parse(r#"{ "players": [{ "id": "p1", "name": "Ana" }] }"#);
        assert_eq!(
            config.player_directory().display_name("p1").as_deref(),
            Some("Ana")
        );
    }
}
