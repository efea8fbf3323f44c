//! Map data providers and ordered failover between them.
//!
//! A provider answers one query with parsed [`MapData`]. The
//! [`FailoverFetcher`] asks its providers one at a time, in order, and returns
//! the first well-formed answer. Failed attempts are not retried in place and
//! there is no backoff; the next provider is tried immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formats::{MapData, MapDataError};
use tracing::{debug, info, warn};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.openstreetmap.ru/api/interpreter",
];

/// One failed attempt against one provider.
#[derive(Debug)]
pub enum DataSourceError {
    Timeout {
        provider: String,
        after: Duration,
    },
    Transport {
        provider: String,
        source: reqwest::Error,
    },
    Status {
        provider: String,
        status: u16,
    },
    Malformed {
        provider: String,
        source: MapDataError,
    },
}

impl DataSourceError {
    pub fn provider(&self) -> &str {
        match self {
            DataSourceError::Timeout { provider, .. }
            | DataSourceError::Transport { provider, .. }
            | DataSourceError::Status { provider, .. }
            | DataSourceError::Malformed { provider, .. } => provider,
        }
    }

    /// Overload or server-side failure. Other errors still fail over, this
    /// only distinguishes them in logs.
    pub fn is_transient(&self) -> bool {
        match self {
            DataSourceError::Timeout { .. } | DataSourceError::Transport { .. } => true,
            DataSourceError::Status { status, .. } => *status == 429 || *status >= 500,
            DataSourceError::Malformed { .. } => false,
        }
    }
}

impl std::fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceError::Timeout { provider, after } => {
                write!(f, "{provider}: no response within {}s", after.as_secs_f64())
            }
            DataSourceError::Transport { provider, source } => {
                write!(f, "{provider}: request failed: {source}")
            }
            DataSourceError::Status { provider, status } => {
                write!(f, "{provider}: HTTP status {status}")
            }
            DataSourceError::Malformed { provider, source } => {
                write!(f, "{provider}: malformed response: {source}")
            }
        }
    }
}

impl std::error::Error for DataSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataSourceError::Transport { source, .. } => Some(source),
            DataSourceError::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Every provider failed.
#[derive(Debug)]
pub enum FetchError {
    DataSourceUnavailable {
        attempts: usize,
        last: Option<DataSourceError>,
    },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::DataSourceUnavailable {
                attempts,
                last: Some(last),
            } => write!(
                f,
                "map data unavailable after {attempts} provider(s); last error: {last}"
            ),
            FetchError::DataSourceUnavailable { last: None, .. } => {
                write!(f, "map data unavailable: no providers configured")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::DataSourceUnavailable { last, .. } => {
                last.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// Trait for map data providers.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait MapDataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<MapData, DataSourceError>>;
}

fn parse_body(provider: &str, body: &[u8]) -> Result<MapData, DataSourceError> {
    MapData::from_json_slice(body).map_err(|source| DataSourceError::Malformed {
        provider: provider.to_string(),
        source,
    })
}

/// Overpass-compatible HTTP endpoint. The query is POSTed form-encoded as
/// `data=<query>`.
pub struct HttpProvider {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
            timeout,
        }
    }
}

impl MapDataProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn fetch<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<MapData, DataSourceError>> {
        Box::pin(async move {
            let attempt = async {
                let resp = self
                    .client
                    .post(&self.endpoint)
                    .form(&[("data", query)])
                    .send()
                    .await?;
                let status = resp.status();
                let body = resp.bytes().await?;
                Ok::<_, reqwest::Error>((status, body))
            };

            // Dropping the attempt on timeout aborts the in-flight request.
            let (status, body) = match tokio::time::timeout(self.timeout, attempt).await {
                Err(_) => {
                    return Err(DataSourceError::Timeout {
                        provider: self.endpoint.clone(),
                        after: self.timeout,
                    });
                }
                Ok(Err(source)) => {
                    return Err(DataSourceError::Transport {
                        provider: self.endpoint.clone(),
                        source,
                    });
                }
                Ok(Ok(v)) => v,
            };

            if !status.is_success() {
                return Err(DataSourceError::Status {
                    provider: self.endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            parse_body(&self.endpoint, &body)
        })
    }
}

/// Canned answer for a [`StaticProvider`].
#[derive(Debug, Clone)]
pub enum StaticResponse {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
}

/// In-memory provider for offline runs and tests. Answers every query the same
/// way and counts how often it was asked.
pub struct StaticProvider {
    name: String,
    response: StaticResponse,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, response: StaticResponse) -> Self {
        Self {
            name: name.into(),
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_body(name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(name, StaticResponse::Body(body.into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MapDataProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch<'a>(&'a self, _query: &'a str) -> BoxFuture<'a, Result<MapData, DataSourceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            match &self.response {
                StaticResponse::Body(body) => parse_body(&self.name, body),
                StaticResponse::Status(status) => Err(DataSourceError::Status {
                    provider: self.name.clone(),
                    status: *status,
                }),
                StaticResponse::Timeout => Err(DataSourceError::Timeout {
                    provider: self.name.clone(),
                    after: Duration::ZERO,
                }),
            }
        })
    }
}

/// Provider list and per-attempt limits.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub endpoints: Vec<String>,
    /// Client-side bound on one provider attempt.
    pub attempt_timeout: Duration,
    /// `[timeout:N]` passed to the Overpass server.
    pub server_timeout_secs: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            attempt_timeout: Duration::from_secs(25),
            server_timeout_secs: 25,
        }
    }
}

/// Tries providers strictly in order; never concurrently.
pub struct FailoverFetcher {
    providers: Vec<Arc<dyn MapDataProvider>>,
}

impl FailoverFetcher {
    pub fn new(providers: Vec<Arc<dyn MapDataProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &FetchConfig, client: reqwest::Client) -> Self {
        let providers = config
            .endpoints
            .iter()
            .map(|endpoint| {
                Arc::new(HttpProvider::new(
                    endpoint.clone(),
                    client.clone(),
                    config.attempt_timeout,
                )) as Arc<dyn MapDataProvider>
            })
            .collect();
        Self::new(providers)
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn fetch(&self, query: &str) -> Result<MapData, FetchError> {
        let mut last: Option<DataSourceError> = None;
        for (attempt, provider) in self.providers.iter().enumerate() {
            debug!(provider = provider.name(), attempt, "querying map data provider");
            match provider.fetch(query).await {
                Ok(data) => {
                    info!(
                        provider = provider.name(),
                        features = data.features().len(),
                        nodes = data.node_count(),
                        "map data fetched"
                    );
                    if let Some(remark) = data.remark() {
                        warn!(provider = provider.name(), remark, "provider attached a remark");
                    }
                    return Ok(data);
                }
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        transient = err.is_transient(),
                        "map data provider failed: {err}"
                    );
                    last = Some(err);
                }
            }
        }

        Err(FetchError::DataSourceUnavailable {
            attempts: self.providers.len(),
            last,
        })
    }
}
