//! Client options and configuration
//!
//! This module contains the configuration for [`GatewayClient`](crate::GatewayClient),
//! including a builder and loading from environment variables.

use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Default backend origin when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default session refresh endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default delay between document status polls (1.5 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Default give-up time for document processing (2 minutes)
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(120_000);

// ============================================================================
// Client Options
// ============================================================================

/// Main options for the gateway client
#[derive(Clone)]
pub struct ClientOptions {
    /// Backend origin, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Path of the session refresh endpoint
    pub refresh_path: String,
    /// Delay between document status polls
    pub poll_interval: Duration,
    /// Give-up time for document processing, measured from upload start
    pub poll_timeout: Duration,
    /// Per-request timeout applied by the HTTP transport
    pub request_timeout: Option<Duration>,
    /// Bearer token for token-based credentials (cookies are always kept)
    pub bearer_token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            request_timeout: None,
            bearer_token: None,
        }
    }
}

impl ClientOptions {
    /// Create a new builder for `ClientOptions`
    #[must_use]
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Load options from `GATEWAY_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns error if a variable is set but cannot be parsed, or if the
    /// resulting options fail validation
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();

        if let Ok(url) = std::env::var("GATEWAY_BASE_URL") {
            options.base_url = url;
        }
        if let Some(interval) = env_millis("GATEWAY_POLL_INTERVAL_MS")? {
            options.poll_interval = interval;
        }
        if let Some(timeout) = env_millis("GATEWAY_POLL_TIMEOUT_MS")? {
            options.poll_timeout = timeout;
        }
        options.request_timeout = env_millis("GATEWAY_REQUEST_TIMEOUT_MS")?;
        options.bearer_token = std::env::var("GATEWAY_TOKEN").ok().filter(|t| !t.is_empty());

        options.validate()?;
        Ok(options)
    }

    /// Check option invariants
    ///
    /// # Errors
    /// Returns error if the base URL is empty or the poll settings are unusable
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::invalid_config("base_url must not be empty"));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(GatewayError::invalid_config(format!(
                "refresh_path must start with '/': {}",
                self.refresh_path
            )));
        }
        self.poll_options().validate()
    }

    /// Poll settings derived from these options
    #[must_use]
    pub const fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: self.poll_interval,
            timeout: self.poll_timeout,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("refresh_path", &self.refresh_path)
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn env_millis(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| GatewayError::invalid_config(format!("{name}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

// ============================================================================
// Builder for ClientOptions
// ============================================================================

/// Builder for `ClientOptions`
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    /// Set backend origin
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.options.base_url = url.into();
        self
    }

    /// Set refresh endpoint path
    #[must_use]
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.options.refresh_path = path.into();
        self
    }

    /// Set default poll interval
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Set default poll timeout
    #[must_use]
    pub const fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.options.poll_timeout = timeout;
        self
    }

    /// Set per-request timeout
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    /// Set bearer token
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.options.bearer_token = Some(token.into());
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClientOptions {
        self.options
    }
}

// ============================================================================
// Poll Options
// ============================================================================

/// Per-upload polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between status fetches
    pub interval: Duration,
    /// Give-up time, measured from upload start
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollOptions {
    /// Override the interval
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that polling can make progress
    ///
    /// # Errors
    /// Returns error for a zero interval or a timeout shorter than one interval
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(GatewayError::invalid_config("poll interval must be non-zero"));
        }
        if self.timeout < self.interval {
            return Err(GatewayError::invalid_config(format!(
                "poll timeout {:?} is shorter than the interval {:?}",
                self.timeout, self.interval
            )));
        }
        Ok(())
    }
}
