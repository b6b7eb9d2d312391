use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, MatchRecordEntity};

pub const LIVE_PREFIX: &str = "live::";
pub const RECORD_PREFIX: &str = "record::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Subset of `GET /{db}` used to anchor the changes feed.
#[derive(Debug, Deserialize)]
pub struct DatabaseInfo {
    pub update_seq: Value,
}

/// Body of a `_changes` longpoll answer.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    pub results: Vec<ChangeRow>,
    pub last_seq: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Live mirror document: one per match, overwritten on every local mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchLiveDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: MatchEntity,
}

impl From<(MatchEntity, Option<String>)> for CouchLiveDocument {
    fn from((game, rev): (MatchEntity, Option<String>)) -> Self {
        Self {
            id: live_doc_id(game.id),
            rev,
            game,
        }
    }
}

/// History document holding one finalized record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub record: MatchRecordEntity,
}

impl From<(MatchRecordEntity, Option<String>)> for CouchRecordDocument {
    fn from((record, rev): (MatchRecordEntity, Option<String>)) -> Self {
        Self {
            id: record_doc_id(record.game.id),
            rev,
            record,
        }
    }
}

pub fn live_doc_id(id: Uuid) -> String {
    format!("{}{}", LIVE_PREFIX, id)
}

pub fn record_doc_id(id: Uuid) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

/// CouchDB sequences are opaque strings in 2.x+ and integers in 1.x.
pub fn sequence_token(value: &Value) -> String {
    match value {
        Value::String(seq) => seq.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_tokens_accept_strings_and_numbers() {
        assert_eq!(sequence_token(&json!("12-g1AAAA")), "12-g1AAAA");
        assert_eq!(sequence_token(&json!(42)), "42");
    }

    #[test]
    fn database_info_keeps_the_update_sequence() {
        let info: DatabaseInfo = serde_json::from_value(json!({
            "db_name": "anotador",
            "doc_count": 3,
            "update_seq": "7-g1AAAAB",
        }))
        .unwrap();
        assert_eq!(sequence_token(&info.update_seq), "7-g1AAAAB");
    }

    #[test]
    fn doc_ids_are_prefixed_by_kind() {
        let id = Uuid::nil();
        assert_eq!(
            live_doc_id(id),
            "live::00000000-0000-0000-0000-000000000000"
        );
        assert!(record_doc_id(id).starts_with(RECORD_PREFIX));
    }
}
