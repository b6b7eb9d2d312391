//! Single JSON file holding the active match so it survives a restart.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::{fs, sync::Mutex};

use crate::dao::models::MatchEntity;

/// Failures reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem access failed.
    #[error("snapshot I/O failed for `{path}`")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file exists but does not hold a match.
    #[error("snapshot `{path}` is not a valid match document")]
    Decode {
        /// Snapshot file.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The match could not be encoded.
    #[error("failed to encode match snapshot")]
    Encode(#[source] serde_json::Error),
}

/// Location of the snapshot file; a disabled snapshot ignores every call.
pub struct LocalSnapshot {
    path: Option<PathBuf>,
    write_gate: Mutex<()>,
}

impl LocalSnapshot {
    /// Snapshot stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_gate: Mutex::new(()),
        }
    }

    /// Snapshot that never touches the filesystem.
    pub fn disabled() -> Self {
        Self {
            path: None,
            write_gate: Mutex::new(()),
        }
    }

    /// Configured path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the stored match. A missing file is not an error.
    pub async fn load(&self) -> Result<Option<MatchEntity>, SnapshotError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let contents = match fs::read(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|source| SnapshotError::Decode {
                path: path.clone(),
                source,
            })
    }

    /// Replace the stored match. The file is written aside then renamed.
    pub async fn save(&self, game: &MatchEntity) -> Result<(), SnapshotError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let payload = serde_json::to_vec_pretty(game).map_err(SnapshotError::Encode)?;
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SnapshotError::Io { path, source }
        };

        let _gate = self.write_gate.lock().await;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, payload)
            .await
            .map_err(io_error(&staging))?;
        fs::rename(&staging, path).await.map_err(io_error(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        bids::BidType,
        ledger::TeamId,
        session::{MatchMode, MatchSession},
        win_policy::TargetScore,
    };

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("anotador-snapshot-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[tokio::test]
    async fn saved_match_is_loaded_verbatim() {
        let path = scratch_path("current_match.json");
        let snapshot = LocalSnapshot::new(&path);

        let mut session = MatchSession::new(MatchMode::TwoVsTwo, TargetScore::Thirty);
        session
            .add_points(TeamId::Nosotros, 3, BidType::RealEnvido)
            .unwrap();
        let game = MatchEntity::from(session.state());

        snapshot.save(&game).await.unwrap();
        assert_eq!(snapshot.load().await.unwrap(), Some(game));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let snapshot = LocalSnapshot::new(scratch_path("absent.json"));
        assert!(snapshot.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_is_reported() {
        let path = scratch_path("broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let result = LocalSnapshot::new(&path).load().await;
        assert!(matches!(result, Err(SnapshotError::Decode { .. })));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn disabled_snapshot_is_inert() {
        let snapshot = LocalSnapshot::disabled();
        let session = MatchSession::new(MatchMode::OneVsOne, TargetScore::Fifteen);
        snapshot
            .save(&MatchEntity::from(session.state()))
            .await
            .unwrap();
        assert!(snapshot.load().await.unwrap().is_none());
        assert!(snapshot.path().is_none());
    }
}
