use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the hazard feeds live and how to talk to them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub base_url: String,
    /// Probed alongside each data fetch when set. Failures only log.
    pub health_path: Option<String>,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            health_path: Some(DEFAULT_HEALTH_PATH.to_string()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn without_health_check(mut self) -> Self {
        self.health_path = None;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Cap on the health probe: never more than half the request timeout.
    pub fn probe_timeout(&self) -> Duration {
        self.health_timeout.min(self.request_timeout / 2)
    }

    pub fn hazard_url(&self, path: &str) -> String {
        format!("{}/hazard/{path}", self.base_url.trim_end_matches('/'))
    }

    pub fn health_url(&self) -> Option<String> {
        self.health_path
            .as_deref()
            .map(|p| format!("{}{p}", self.base_url.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::FeedConfig;
    use std::time::Duration;

    #[test]
    fn urls_ignore_trailing_slash() {
        let config = FeedConfig::new("http://feeds.local:8080/");
        assert_eq!(
            config.hazard_url("flood"),
            "http://feeds.local:8080/hazard/flood"
        );
        assert_eq!(
            config.health_url().as_deref(),
            Some("http://feeds.local:8080/health")
        );
        assert_eq!(config.without_health_check().health_url(), None);
    }

    #[test]
    fn probe_timeout_stays_below_request_timeout() {
        let config = FeedConfig::default();
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));

        let tight = FeedConfig::default().with_timeout(Duration::from_millis(800));
        assert_eq!(tight.probe_timeout(), Duration::from_millis(400));
    }
}
