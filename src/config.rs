//! Engine configuration
//!
//! Configuration is read from environment variables with explicit defaults for
//! everything, so a bare `EngineConfig::from_env()` always succeeds. The CLI may
//! override individual fields afterwards; `validate()` is the single place that
//! rejects unusable values.

use crate::backend::error::{EngineError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default analytics backend address (local development server)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default location of the persisted view preferences
pub const DEFAULT_PREFERENCES_PATH: &str = ".report-engine/preferences.json";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the analytics backend, without trailing slash
    pub base_url: String,

    /// Optional bearer token sent with every request
    pub token: Option<String>,

    /// Column metadata endpoint (GET)
    pub columns_path: String,

    /// Chart aggregation endpoint (POST)
    pub chart_path: String,

    /// Pivot aggregation endpoint (POST)
    pub pivot_path: String,

    /// Column recast endpoint (POST)
    pub recast_path: String,

    /// TCP connect timeout
    ///
    /// Aggregation queries deliberately carry no overall request timeout: a slow
    /// pivot over a large dataset is superseded by the user, not cut off.
    pub connect_timeout: Duration,

    /// Where the last-active-tab preference is stored
    pub preferences_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            columns_path: "/api/reports/columns".to_string(),
            chart_path: "/api/chart-data".to_string(),
            pivot_path: "/api/pivot-data".to_string(),
            recast_path: "/api/database/recast".to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            preferences_path: PathBuf::from(DEFAULT_PREFERENCES_PATH),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables
    ///
    /// Recognized variables:
    /// - `REPORT_BACKEND_URI`: backend base URL
    /// - `REPORT_BACKEND_TOKEN`: bearer token
    /// - `REPORT_CONNECT_TIMEOUT_SECS`: connect timeout in seconds
    /// - `REPORT_PREFERENCES`: preferences file path
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = VarReader::new(lookup);
        let defaults = Self::default();

        let base_url = vars.get_string("REPORT_BACKEND_URI", &defaults.base_url);
        let token = vars.get_optional_string("REPORT_BACKEND_TOKEN");
        let connect_timeout = Duration::from_secs(
            vars.get_u64("REPORT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        );
        let preferences_path = vars
            .get_optional_string("REPORT_PREFERENCES")
            .map(PathBuf::from)
            .unwrap_or(defaults.preferences_path);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            connect_timeout,
            preferences_path,
            ..Self::default()
        }
    }

    /// Reject configurations no request could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(EngineError::Config("backend URL is empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(EngineError::Config(format!(
                "backend URL '{}' must start with http:// or https://",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Join the base URL with an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Reads configuration variables with type-safe conversions and explicit defaults
struct VarReader<F> {
    lookup: F,
}

impl<F> VarReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Get raw value (None if not set or empty)
    fn get_raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn get_string(&self, name: &str, default: &str) -> String {
        self.get_raw(name).unwrap_or_else(|| default.to_string())
    }

    fn get_optional_string(&self, name: &str) -> Option<String> {
        self.get_raw(name)
    }

    fn get_u64(&self, name: &str, default: u64) -> u64 {
        match self.get_raw(name) {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    variable = name,
                    value = %raw,
                    default,
                    "Invalid integer value, using default"
                );
                default
            }),
            None => default,
        }
    }
}
