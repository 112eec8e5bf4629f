//! In-memory document store - used as fallback when no cluster is configured.
//!
//! Answers with the same status codes and response envelopes as
//! Elasticsearch for the requests the post storage issues.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use scribe_core::error::BackendError;
use scribe_core::ports::{DocumentStore, StoreResponse};

struct StoredDocument {
    source: Value,
    version: u64,
}

type Index = BTreeMap<String, StoredDocument>;

/// In-memory document store using nested maps behind an async RwLock.
///
/// Note: Data is lost on process restart.
pub struct InMemoryDocumentStore {
    indices: RwLock<HashMap<String, Index>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn error_response(status: u16, kind: &str, reason: String) -> StoreResponse {
    StoreResponse::new(
        status,
        json!({
            "error": { "type": kind, "reason": reason },
            "status": status,
        }),
    )
}

fn index_not_found(index: &str) -> StoreResponse {
    error_response(
        404,
        "index_not_found_exception",
        format!("no such index [{index}]"),
    )
}

fn document_missing(index: &str, id: &str) -> StoreResponse {
    StoreResponse::new(
        404,
        json!({ "_index": index, "_id": id, "found": false, "result": "not_found" }),
    )
}

/// Lowercased alphanumeric terms.
fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn field_terms(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => terms(s).collect(),
        Value::Array(items) => items.iter().flat_map(field_terms).collect(),
        _ => Vec::new(),
    }
}

/// Number of query terms found in any of the fields, 0 for no match.
fn score(source: &Value, fields: &[&str], query_terms: &[String]) -> usize {
    let haystack: Vec<String> = fields
        .iter()
        .filter_map(|field| source.get(*field))
        .flat_map(field_terms)
        .collect();

    query_terms
        .iter()
        .filter(|term| haystack.contains(term))
        .count()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, index: &str, id: &str, document: Value) -> Result<StoreResponse, BackendError> {
        let mut indices = self.indices.write().await;
        let docs = indices.entry(index.to_string()).or_default();

        if docs.contains_key(id) {
            return Ok(error_response(
                409,
                "version_conflict_engine_exception",
                format!("[{id}]: version conflict, document already exists (current version [1])"),
            ));
        }

        docs.insert(
            id.to_string(),
            StoredDocument {
                source: document,
                version: 1,
            },
        );

        Ok(StoreResponse::new(
            201,
            json!({ "_index": index, "_id": id, "_version": 1, "result": "created" }),
        ))
    }

    async fn update(&self, index: &str, id: &str, body: Value) -> Result<StoreResponse, BackendError> {
        let Some(Value::Object(fields)) = body.get("doc").cloned() else {
            return Ok(error_response(
                400,
                "action_request_validation_exception",
                "Validation Failed: 1: script or doc is missing;".to_string(),
            ));
        };

        let mut indices = self.indices.write().await;
        let Some(doc) = indices.get_mut(index).and_then(|docs| docs.get_mut(id)) else {
            return Ok(error_response(
                404,
                "document_missing_exception",
                format!("[{id}]: document missing"),
            ));
        };

        if !doc.source.is_object() {
            doc.source = Value::Object(Map::new());
        }
        if let Value::Object(source) = &mut doc.source {
            source.extend(fields);
        }
        doc.version += 1;

        Ok(StoreResponse::new(
            200,
            json!({ "_index": index, "_id": id, "_version": doc.version, "result": "updated" }),
        ))
    }

    async fn delete(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError> {
        let mut indices = self.indices.write().await;
        let removed = indices.get_mut(index).and_then(|docs| docs.remove(id));

        match removed {
            Some(doc) => Ok(StoreResponse::new(
                200,
                json!({ "_index": index, "_id": id, "_version": doc.version + 1, "result": "deleted" }),
            )),
            None => Ok(document_missing(index, id)),
        }
    }

    async fn get(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError> {
        let indices = self.indices.read().await;
        let Some(docs) = indices.get(index) else {
            return Ok(index_not_found(index));
        };

        match docs.get(id) {
            Some(doc) => Ok(StoreResponse::new(
                200,
                json!({
                    "_index": index,
                    "_id": id,
                    "_version": doc.version,
                    "found": true,
                    "_source": doc.source,
                }),
            )),
            None => Ok(document_missing(index, id)),
        }
    }

    async fn search(&self, index: &str, query: Value) -> Result<StoreResponse, BackendError> {
        let indices = self.indices.read().await;
        let Some(docs) = indices.get(index) else {
            return Ok(index_not_found(index));
        };

        let Some(text) = query.pointer("/query/query_string/query").and_then(Value::as_str) else {
            return Ok(error_response(
                400,
                "parsing_exception",
                "only query_string queries are supported".to_string(),
            ));
        };
        let fields: Vec<&str> = query
            .pointer("/query/query_string/fields")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let match_all = text.trim() == "*";
        let query_terms: Vec<String> = terms(text).collect();

        let mut hits: Vec<(usize, &String, &StoredDocument)> = docs
            .iter()
            .filter_map(|(id, doc)| {
                let score = if match_all {
                    1
                } else {
                    score(&doc.source, &fields, &query_terms)
                };
                (score > 0).then_some((score, id, doc))
            })
            .collect();
        hits.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let max_score = hits.first().map(|(score, _, _)| *score as f64);
        let hits: Vec<Value> = hits
            .into_iter()
            .map(|(score, id, doc)| {
                json!({
                    "_index": index,
                    "_id": id,
                    "_score": score as f64,
                    "_source": doc.source,
                })
            })
            .collect();

        Ok(StoreResponse::new(
            200,
            json!({
                "took": 0,
                "timed_out": false,
                "_shards": { "total": 1, "successful": 1, "skipped": 0, "failed": 0 },
                "hits": {
                    "total": { "value": hits.len(), "relation": "eq" },
                    "max_score": max_score,
                    "hits": hits,
                },
            }),
        ))
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<StoreResponse, BackendError> {
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Ok(error_response(
                400,
                "resource_already_exists_exception",
                format!("index [{index}] already exists"),
            ));
        }
        indices.insert(index.to_string(), Index::new());

        Ok(StoreResponse::new(
            200,
            json!({ "acknowledged": true, "shards_acknowledged": true, "index": index }),
        ))
    }
}
