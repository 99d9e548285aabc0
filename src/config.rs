//! Configuration for talking to the processing service.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. Setters clamp obviously bad values; `build()`
//! rejects the ones that cannot be clamped (an unparseable URL).

use crate::error::WorkflowError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default backend address, matching the service's development port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for a [`crate::workflow::Workflow`] and its HTTP service.
///
/// # Example
/// ```rust
/// use pdfer::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://pdf.example.com")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://pdf.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root URL of the processing service. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Whole-request timeout in seconds. Default: 120.
    ///
    /// Processing a large PDF server-side can take a while; the timeout
    /// covers upload, server work and response together.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Interval between simulated upload progress ticks. Default: 100 ms.
    pub progress_tick_ms: u64,

    /// Percentage added per tick. Default: 10.
    pub progress_step: u8,

    /// Highest percentage the ticker reports before the upload settles.
    /// Range: 0–99. Default: 90.
    pub progress_ceiling: u8,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            progress_tick_ms: 100,
            progress_step: 10,
            progress_ceiling: 90,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    /// Parsed base URL with a trailing slash, ready for `Url::join`.
    pub fn base(&self) -> Result<Url, WorkflowError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| {
            WorkflowError::InvalidConfig(format!("base URL '{}': {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(WorkflowError::InvalidConfig(format!(
                "base URL must be http or https, got '{other}'"
            ))),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_tick_ms(mut self, ms: u64) -> Self {
        self.config.progress_tick_ms = ms.max(1);
        self
    }

    pub fn progress_step(mut self, step: u8) -> Self {
        self.config.progress_step = step.clamp(1, 99);
        self
    }

    pub fn progress_ceiling(mut self, ceiling: u8) -> Self {
        self.config.progress_ceiling = ceiling.min(99);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, WorkflowError> {
        self.config.base()?;
        Ok(self.config)
    }
}
