//! Hazard sources: one feed each, fetched independently.
//!
//! Implementations return boxed futures so a set of sources can be held as
//! trait objects and polled side by side.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formats::{FeaturePayload, RawFeature};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::Classifier;
use crate::config::FeedConfig;
use crate::protocol::{HazardKind, HazardScope};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source-level failure. Isolated to the source that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("undecodable payload: {0}")]
    Decode(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// One hazard feed.
///
/// `fetch` yields raw features already tagged with a risk classification;
/// geometry validation happens downstream so rejections can be logged with
/// the selection they belong to.
pub trait HazardSource: Send + Sync {
    fn kind(&self) -> HazardKind;

    fn fetch(&self, scope: Option<HazardScope>)
    -> BoxFuture<'_, Result<Vec<RawFeature>, FetchError>>;
}

/// Fetches `GET {base}/hazard/{kind}` over HTTP.
pub struct HttpHazardSource {
    kind: HazardKind,
    classifier: Classifier,
    config: FeedConfig,
    client: reqwest::Client,
}

impl HttpHazardSource {
    pub fn new(kind: HazardKind, config: FeedConfig) -> Self {
        Self::with_client(kind, config, reqwest::Client::new())
    }

    pub fn with_client(kind: HazardKind, config: FeedConfig, client: reqwest::Client) -> Self {
        Self {
            kind,
            classifier: Classifier::for_kind(kind),
            config,
            client,
        }
    }

    pub fn url(&self) -> String {
        self.config.hazard_url(self.kind.path())
    }

    async fn probe_health(&self) {
        let Some(url) = self.config.health_url() else {
            return;
        };
        let result = self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout())
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(kind = %self.kind, "feed health check ok");
            }
            Ok(resp) => {
                warn!(kind = %self.kind, status = resp.status().as_u16(), "feed health check failed; fetching anyway");
            }
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "feed health check unreachable; fetching anyway");
            }
        }
    }

    async fn fetch_data(&self, scope: Option<HazardScope>) -> Result<Vec<RawFeature>, FetchError> {
        let timeout = self.config.request_timeout;
        let mut request = self.client.get(self.url()).timeout(timeout);
        if let Some(scope) = scope {
            request = request.query(&scope.query_pairs());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;
        let mut payload = FeaturePayload::from_json_str(&body, self.kind.path())
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        self.classifier.classify_all(&mut payload.features);

        debug!(kind = %self.kind, features = payload.len(), "fetched hazard feed");
        Ok(payload.features)
    }
}

impl HazardSource for HttpHazardSource {
    fn kind(&self) -> HazardKind {
        self.kind
    }

    fn fetch(
        &self,
        scope: Option<HazardScope>,
    ) -> BoxFuture<'_, Result<Vec<RawFeature>, FetchError>> {
        Box::pin(async move {
            // The probe runs beside the data request and only logs.
            let ((), result) = tokio::join!(self.probe_health(), self.fetch_data(scope));
            result
        })
    }
}

/// In-memory source serving a fixed payload or failure.
///
/// Used by tests and demos; an optional delay makes arrival order
/// controllable.
pub struct StaticHazardSource {
    kind: HazardKind,
    response: Mutex<Result<Value, FetchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticHazardSource {
    pub fn new(kind: HazardKind, payload: Value) -> Self {
        Self {
            kind,
            response: Mutex::new(Ok(payload)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(kind: HazardKind, error: FetchError) -> Self {
        Self {
            kind,
            response: Mutex::new(Err(error)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_payload(&self, payload: Value) {
        *self.response.lock() = Ok(payload);
    }

    pub fn set_failure(&self, error: FetchError) {
        *self.response.lock() = Err(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HazardSource for StaticHazardSource {
    fn kind(&self) -> HazardKind {
        self.kind
    }

    fn fetch(
        &self,
        _scope: Option<HazardScope>,
    ) -> BoxFuture<'_, Result<Vec<RawFeature>, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response.lock().clone();
        let delay = self.delay;
        let kind = self.kind;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut payload = FeaturePayload::from_value(response?, kind.path())
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            Classifier::for_kind(kind).classify_all(&mut payload.features);
            Ok(payload.features)
        })
    }
}

/// The registered sources, at most one per kind.
#[derive(Clone, Default)]
pub struct SourceSet {
    sources: Vec<Arc<dyn HazardSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP sources for `kinds`, sharing one client.
    pub fn http(config: &FeedConfig, kinds: &[HazardKind]) -> Self {
        let client = reqwest::Client::new();
        let mut set = Self::new();
        for &kind in kinds {
            set.insert(Arc::new(HttpHazardSource::with_client(
                kind,
                config.clone(),
                client.clone(),
            )));
        }
        set
    }

    /// Adds a source, replacing any previous source of the same kind.
    pub fn insert(&mut self, source: Arc<dyn HazardSource>) {
        let kind = source.kind();
        self.sources.retain(|s| s.kind() != kind);
        self.sources.push(source);
    }

    pub fn with(mut self, source: Arc<dyn HazardSource>) -> Self {
        self.insert(source);
        self
    }

    pub fn get(&self, kind: HazardKind) -> Option<Arc<dyn HazardSource>> {
        self.sources.iter().find(|s| s.kind() == kind).cloned()
    }

    pub fn kinds(&self) -> Vec<HazardKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("kinds", &self.kinds())
            .finish()
    }
}
