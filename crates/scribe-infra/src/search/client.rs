//! Elasticsearch REST client over reqwest.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};

use scribe_core::error::BackendError;
use scribe_core::ports::{DocumentStore, StoreResponse};

use super::config::SearchConfig;

/// Elasticsearch document store.
///
/// The underlying `reqwest::Client` pools connections and is safe to share
/// across requests.
pub struct ElasticsearchClient {
    base_url: Url,
    http: Client,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    pub fn new(url: &str, config: &SearchConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(url).map_err(|e| BackendError::Transport(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Transport(format!("invalid cluster URL: {url}")));
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        tracing::info!(url = %base_url, "Elasticsearch client configured");

        Ok(Self {
            base_url,
            http,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Create from environment configuration. Fails when no URL is set.
    pub fn from_config(config: &SearchConfig) -> Result<Self, BackendError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| BackendError::Transport("ELASTICSEARCH_URL is not set".to_string()))?;
        Self::new(url, config)
    }

    /// Build an endpoint URL; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let req = self.http.request(method, self.endpoint(segments));
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    async fn send(req: RequestBuilder) -> Result<StoreResponse, BackendError> {
        let res = req
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = res.status().as_u16();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(StoreResponse::new(status, parse_body(&bytes)))
    }
}

/// `.` and `..` are dropped by URL path normalization, even percent-encoded,
/// so no request can address a document with such an id.
fn is_dot_segment(id: &str) -> bool {
    matches!(id, "." | "..")
}

fn unaddressable(index: &str, id: &str) -> StoreResponse {
    StoreResponse::new(
        404,
        json!({ "_index": index, "_id": id, "found": false, "result": "not_found" }),
    )
}

/// Error bodies are not always JSON; keep them as text in that case.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[async_trait]
impl DocumentStore for ElasticsearchClient {
    async fn create(&self, index: &str, id: &str, document: Value) -> Result<StoreResponse, BackendError> {
        if is_dot_segment(id) {
            return Ok(StoreResponse::new(
                400,
                json!({
                    "error": { "type": "illegal_argument_exception", "reason": format!("invalid document id [{id}]") },
                    "status": 400,
                }),
            ));
        }
        Self::send(self.request(Method::PUT, &[index, "_create", id]).json(&document)).await
    }

    async fn update(&self, index: &str, id: &str, body: Value) -> Result<StoreResponse, BackendError> {
        if is_dot_segment(id) {
            return Ok(unaddressable(index, id));
        }
        Self::send(self.request(Method::POST, &[index, "_update", id]).json(&body)).await
    }

    async fn delete(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError> {
        if is_dot_segment(id) {
            return Ok(unaddressable(index, id));
        }
        Self::send(self.request(Method::DELETE, &[index, "_doc", id])).await
    }

    async fn get(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError> {
        if is_dot_segment(id) {
            return Ok(unaddressable(index, id));
        }
        Self::send(self.request(Method::GET, &[index, "_doc", id])).await
    }

    async fn search(&self, index: &str, query: Value) -> Result<StoreResponse, BackendError> {
        let req = self
            .request(Method::POST, &[index, "_search"])
            .query(&[("track_total_hits", "true")])
            .json(&query);
        Self::send(req).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        let res = Self::send(self.request(Method::HEAD, &[index])).await?;
        match StatusCode::from_u16(res.status) {
            Ok(StatusCode::OK) => Ok(true),
            Ok(StatusCode::NOT_FOUND) => Ok(false),
            _ => Err(res.into_error()),
        }
    }

    async fn create_index(&self, index: &str) -> Result<StoreResponse, BackendError> {
        let settings = json!({
            "mappings": {
                "properties": {
                    "id": { "type": "keyword" },
                    "title": { "type": "text" },
                    "text": { "type": "text" },
                    "tags": { "type": "text" },
                    "created_at": { "type": "date" }
                }
            }
        });
        Self::send(self.request(Method::PUT, &[index]).json(&settings)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> ElasticsearchClient {
        ElasticsearchClient::new(url, &SearchConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let c = client("http://localhost:9200");
        assert_eq!(
            c.endpoint(&["post", "_doc", "abc"]).as_str(),
            "http://localhost:9200/post/_doc/abc"
        );
    }

    #[test]
    fn test_endpoint_handles_trailing_slash_and_escapes_ids() {
        let c = client("http://localhost:9200/");
        assert_eq!(
            c.endpoint(&["post", "_doc", "a/b c"]).as_str(),
            "http://localhost:9200/post/_doc/a%2Fb%20c"
        );
        assert_eq!(
            c.endpoint(&["post", "_doc", "..."]).as_str(),
            "http://localhost:9200/post/_doc/..."
        );
        assert_eq!(
            c.endpoint(&["post", "_doc", "a.b"]).as_str(),
            "http://localhost:9200/post/_doc/a.b"
        );
    }

    #[tokio::test]
    async fn test_dot_ids_never_reach_the_cluster() {
        // Nothing listens here; any request would fail with a transport error.
        let c = client("http://127.0.0.1:9");

        for id in [".", ".."] {
            let res = c.get("post", id).await.unwrap();
            assert_eq!(res.status, 404);
            assert_eq!(res.body["found"], false);

            assert_eq!(c.delete("post", id).await.unwrap().status, 404);
            assert_eq!(c.update("post", id, json!({"doc": {}})).await.unwrap().status, 404);
            assert_eq!(c.create("post", id, json!({})).await.unwrap().status, 400);
        }
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(ElasticsearchClient::new("mailto:ops@example.com", &SearchConfig::default()).is_err());
    }

    #[test]
    fn test_from_config_requires_url() {
        assert!(ElasticsearchClient::from_config(&SearchConfig::default()).is_err());
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"found":false}"#), json!({"found": false}));
        assert_eq!(parse_body(b"Not Found"), Value::String("Not Found".into()));
    }
}
