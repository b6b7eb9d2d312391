use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::storage::StorageError;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// What went wrong while reading or writing match documents in CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("could not build the CouchDB HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    /// The database URL could not be reached, or creating the database failed in transit.
    #[error("CouchDB database `{database}` is unreachable")]
    DatabaseUnreachable {
        database: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB database `{database}` answered {status}")]
    DatabaseRejected {
        database: String,
        status: StatusCode,
    },
    #[error("request for `{path}` did not reach CouchDB")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB answered {status} for `{path}`")]
    UnexpectedStatus { path: String, status: StatusCode },
    /// The body was not the JSON envelope expected for `path`.
    #[error("unreadable CouchDB answer for `{path}`")]
    MalformedBody {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A stored document does not hold a match.
    #[error("document `{doc_id}` is not a valid match document")]
    MalformedDocument {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CouchDaoError {
    pub(super) fn transport(path: &str) -> impl FnOnce(reqwest::Error) -> Self + '_ {
        move |source| Self::Transport {
            path: path.to_string(),
            source,
        }
    }

    pub(super) fn malformed_body(path: &str) -> impl FnOnce(reqwest::Error) -> Self + '_ {
        move |source| Self::MalformedBody {
            path: path.to_string(),
            source,
        }
    }

    /// HTTP status CouchDB answered with, when it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::DatabaseRejected { status, .. } | Self::UnexpectedStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        let message = match err.status() {
            Some(status) => format!("CouchDB answered {status}"),
            None => "CouchDB request failed".to_string(),
        };
        StorageError::unavailable(message, err)
    }
}
