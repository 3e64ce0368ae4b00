//! Match model configuration loaded via OrthoConfig.
//!
//! Values come from `LENDBOARD_*` environment variables (for example
//! `LENDBOARD_API_KEY`) or an OrthoConfig configuration file.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::outbound::gemini::GeminiConfig;

const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for the external match model.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LENDBOARD")]
pub struct ModelSettings {
    /// Gemini API key. Required for live model calls.
    pub api_key: Option<String>,
    /// Model name override.
    pub model: Option<String>,
    /// API base URL override.
    pub endpoint: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Errors raised when settings cannot produce an adapter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was supplied.
    #[error("LENDBOARD_API_KEY is not set")]
    MissingApiKey,
    /// The endpoint override is not an absolute URL.
    #[error("invalid model endpoint {value:?}: {source}")]
    InvalidEndpoint {
        value: String,
        source: url::ParseError,
    },
}

impl ModelSettings {
    /// Return the configured model name, falling back to the default.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Return the configured endpoint, falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] when the override does not
    /// parse as a URL.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let value = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        Url::parse(value).map_err(|source| ConfigError::InvalidEndpoint {
            value: value.to_owned(),
            source,
        })
    }

    /// Return the request timeout; never shorter than one second.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS).max(1))
    }

    /// Resolve the adapter configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no non-blank key is set,
    /// or [`ConfigError::InvalidEndpoint`].
    pub fn gemini_config(&self) -> Result<GeminiConfig, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(GeminiConfig {
            api_key: Zeroizing::new(api_key.to_owned()),
            model: self.model().to_owned(),
            endpoint: self.endpoint()?,
            timeout: self.timeout(),
        })
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
