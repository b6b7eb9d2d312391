use std::env;

const BASE_URL_VAR: &str = "COUCH_BASE_URL";
const DATABASE_VAR: &str = "COUCH_DB";
const USERNAME_VAR: &str = "COUCH_USERNAME";
const PASSWORD_VAR: &str = "COUCH_PASSWORD";
const DEFAULT_DATABASE: &str = "anotador";

/// Basic-auth pair sent with every CouchDB request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCredentials {
    pub username: String,
    pub password: String,
}

/// Database holding the live mirrors and the finalized match records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    pub credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Read the connection from the process environment.
    ///
    /// `None` when `COUCH_BASE_URL` is unset or blank: matches then stay in
    /// memory on this device. The database defaults to `anotador`, and
    /// credentials are only used when both user and password are present.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let present = |var: &str| lookup(var).filter(|value: &String| !value.trim().is_empty());

        let base_url = present(BASE_URL_VAR)?;
        let database = present(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let config = Self::new(base_url.trim(), database.trim());

        Some(match present(USERNAME_VAR).zip(present(PASSWORD_VAR)) {
            Some((username, password)) => config.with_credentials(username, password),
            None => config,
        })
    }

    /// URL of the database itself.
    pub(super) fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    /// URL of a document or special endpoint (`_changes`, `_all_docs`) of the database.
    pub(super) fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.database_url(), path)
    }
}
