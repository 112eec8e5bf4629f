use std::time::Duration;

/// Search backend configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Cluster URL (e.g., http://localhost:9200). `None` selects the in-memory store.
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Index holding post documents.
    pub index: String,
    /// Upper bound for a single store call.
    pub request_timeout: Duration,
    /// TCP connect timeout for the HTTP client.
    pub connect_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            index: "post".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl SearchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: std::env::var("ELASTICSEARCH_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            username: std::env::var("ELASTICSEARCH_USERNAME").ok(),
            password: std::env::var("ELASTICSEARCH_PASSWORD").ok(),
            index: std::env::var("ELASTICSEARCH_INDEX").unwrap_or(defaults.index),
            request_timeout: secs_from_env("ELASTICSEARCH_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            connect_timeout: secs_from_env("ELASTICSEARCH_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
        }
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
