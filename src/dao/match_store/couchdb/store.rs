use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future::BoxFuture};
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dao::{
    match_store::{MatchSnapshots, MatchStore, merge_record, page_history},
    models::{MatchEntity, MatchRecordEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, ChangesResponse, CouchLiveDocument, CouchRecordDocument, DatabaseInfo,
        END_SUFFIX, RECORD_PREFIX, live_doc_id, record_doc_id, sequence_token,
    },
};

const CHANGES: &str = "_changes";
const LONGPOLL_TIMEOUT_MS: u64 = 30_000;
const CHANGES_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct CouchMatchStore {
    client: Client,
    config: Arc<CouchConfig>,
}

impl CouchMatchStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::Client { source })?;

        let store = Self {
            client,
            config: Arc::new(config),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.request(method, self.config.endpoint_url(path)))
    }

    fn database_request(&self, method: Method) -> reqwest::RequestBuilder {
        self.authorized(self.client.request(method, self.config.database_url()))
    }

    fn unreachable(&self) -> impl FnOnce(reqwest::Error) -> CouchDaoError + '_ {
        move |source| CouchDaoError::DatabaseUnreachable {
            database: self.config.database.clone(),
            source,
        }
    }

    fn rejected(&self, status: StatusCode) -> CouchDaoError {
        CouchDaoError::DatabaseRejected {
            database: self.config.database.clone(),
            status,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(self.unreachable())?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .database_request(Method::PUT)
                    .send()
                    .await
                    .map_err(self.unreachable())?;
                if create.status().is_success() {
                    debug!(database = %self.config.database, "created CouchDB database");
                    Ok(())
                } else {
                    Err(self.rejected(create.status()))
                }
            }
            other => Err(self.rejected(other)),
        }
    }

    /// Current end of the database changes feed.
    async fn update_seq(&self) -> CouchResult<String> {
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(self.unreachable())?;

        if !response.status().is_success() {
            return Err(self.rejected(response.status()));
        }

        let info = response
            .json::<DatabaseInfo>()
            .await
            .map_err(CouchDaoError::malformed_body(&self.config.database))?;
        Ok(sequence_token(&info.update_seq))
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(CouchDaoError::transport(doc_id))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(CouchDaoError::malformed_body(doc_id)),
            other => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(CouchDaoError::transport(doc_id))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(CouchDaoError::transport(ALL_DOCS))?;

        if !response.status().is_success() {
            return Err(CouchDaoError::UnexpectedStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(CouchDaoError::malformed_body(ALL_DOCS))?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::MalformedDocument {
                    doc_id: row.id,
                    source,
                })?;
                documents.push(parsed);
            }
        }

        Ok(documents)
    }

    // TODO: replace the full prefix scan with a view keyed by effective date once
    // history grows past a few hundred records.
    async fn list_records(&self) -> CouchResult<Vec<MatchRecordEntity>> {
        let docs = self
            .list_documents::<CouchRecordDocument>(RECORD_PREFIX)
            .await?;
        Ok(docs.into_iter().map(|doc| doc.record).collect())
    }

    /// Wait for the next change of `doc_id` after `since`.
    async fn poll_changes(
        &self,
        doc_id: &str,
        since: &str,
    ) -> CouchResult<(Vec<MatchEntity>, String)> {
        let query = [
            ("feed", "longpoll".to_string()),
            ("filter", "_doc_ids".to_string()),
            ("doc_ids", format!("[\"{}\"]", doc_id)),
            ("include_docs", "true".to_string()),
            ("since", since.to_string()),
            ("timeout", LONGPOLL_TIMEOUT_MS.to_string()),
        ];

        let response = self
            .request(Method::GET, CHANGES)
            .query(&query)
            .send()
            .await
            .map_err(CouchDaoError::transport(CHANGES))?;

        if !response.status().is_success() {
            return Err(CouchDaoError::UnexpectedStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        let payload = response
            .json::<ChangesResponse>()
            .await
            .map_err(CouchDaoError::malformed_body(CHANGES))?;

        let mut updates = Vec::new();
        for row in payload.results {
            let Some(doc) = row.doc.filter(|_| !row.deleted) else {
                continue;
            };
            let parsed = from_value::<CouchLiveDocument>(doc).map_err(|source| {
                CouchDaoError::MalformedDocument {
                    doc_id: row.id,
                    source,
                }
            })?;
            updates.push(parsed.game);
        }

        Ok((updates, sequence_token(&payload.last_seq)))
    }
}

impl MatchStore for CouchMatchStore {
    fn save_live_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = live_doc_id(game.id);
            let mut doc = CouchLiveDocument::from((game, None));
            if let Some(existing) = store.get_document::<CouchLiveDocument>(&doc_id).await? {
                doc.rev = existing.rev;
            }
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn find_live_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = live_doc_id(id);
            let maybe_doc = store.get_document::<CouchLiveDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.game))
        })
    }

    fn watch_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<MatchSnapshots>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = live_doc_id(id);
            // Read the sequence first: an update landing before the document
            // read is then replayed by the feed instead of lost.
            let mut since = store.update_seq().await?;
            let current = store.get_document::<CouchLiveDocument>(&doc_id).await?;

            let snapshots = async_stream::stream! {
                if let Some(doc) = current {
                    yield Ok(doc.game);
                }

                loop {
                    match store.poll_changes(&doc_id, &since).await {
                        Ok((updates, next)) => {
                            since = next;
                            for game in updates {
                                yield Ok(game);
                            }
                        }
                        Err(err) => {
                            warn!(match_id = %id, error = %err, "CouchDB changes feed failed; retrying");
                            yield Err(StorageError::from(err));
                            tokio::time::sleep(CHANGES_RETRY_DELAY).await;
                        }
                    }
                }
            };
            debug!(match_id = %id, "watching CouchDB live document");
            Ok(snapshots.boxed())
        })
    }

    fn archive_match(&self, record: MatchRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            record.check_consistency()?;
            let doc_id = record_doc_id(record.game.id);
            let existing = store.get_document::<CouchRecordDocument>(&doc_id).await?;
            let (rev, merged) = match existing {
                Some(doc) => (doc.rev, merge_record(Some(&doc.record), record)),
                None => (None, record),
            };
            let doc = CouchRecordDocument::from((merged, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn list_history(
        &self,
        offset: usize,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let records = store.list_records().await?;
            Ok(page_history(records, offset, limit))
        })
    }

    fn list_series(
        &self,
        series_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let records = store.list_records().await?;
            Ok(records
                .into_iter()
                .filter(|record| !record.deleted)
                .filter(|record| record.game.series.is_some_and(|series| series.id == series_id))
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.update_seq().await?;
            Ok(())
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
