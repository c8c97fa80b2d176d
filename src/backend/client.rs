use super::columns::{ColumnCatalog, ColumnDescriptor};
use super::error::{EngineError, Result};
use super::wire::{
    ChartRequest, ChartResponse, ColumnsResponse, Envelope, PivotRequest, PivotResponse,
    RecastRequest,
};
use crate::config::EngineConfig;
use crate::report::QueryBackend;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Generic message for backend failures that carry no message of their own
const GENERIC_FAILURE: &str = "generation failed";

/// HTTP client for the analytics backend
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    http: Client,
    config: EngineConfig,
}

impl AnalyticsClient {
    /// Create a client for the configured backend
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| EngineError::Config(format!("Invalid token format: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create a client from environment variables
    ///
    /// See [`EngineConfig::from_env`] for the recognized variables.
    pub fn from_env() -> Result<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fetch column metadata for the active dataset
    pub async fn fetch_columns(&self) -> Result<ColumnCatalog> {
        let url = self.config.endpoint(&self.config.columns_path);
        tracing::debug!(%url, "GET columns-info");
        let response = self.http.get(&url).send().await?;
        let body: ColumnsResponse = read_envelope(response).await?;

        Ok(ColumnCatalog::new(
            body.columns_info
                .into_iter()
                .map(|info| ColumnDescriptor::new(info.name, info.dtype)),
        ))
    }

    pub async fn fetch_chart(&self, request: &ChartRequest) -> Result<ChartResponse> {
        self.post(&self.config.chart_path, request).await
    }

    pub async fn fetch_pivot(&self, request: &PivotRequest) -> Result<PivotResponse> {
        self.post(&self.config.pivot_path, request).await
    }

    /// Change column types server-side
    pub async fn recast_columns(&self, request: &RecastRequest) -> Result<()> {
        let _: Envelope = self.post(&self.config.recast_path, request).await?;
        Ok(())
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned + Default,
    {
        let url = self.config.endpoint(path);
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload = serde_json::to_string(body).unwrap_or_default();
            tracing::debug!(%url, %payload, "POST");
        }
        let response = self.http.post(&url).json(body).send().await?;
        read_envelope(response).await
    }
}

/// Classify a backend response
///
/// - `{status: "error", message}` (any HTTP status) → `Backend` with the message verbatim
/// - non-2xx with a JSON body but no message → `Backend` with a generic message
/// - non-2xx with a non-JSON body → `Transport` (a proxy or gateway answered, not the backend)
/// - 2xx whose body does not match the expected shape → `R::default()`, i.e. an empty result
async fn read_envelope<R>(response: Response) -> Result<R>
where
    R: DeserializeOwned + Default,
{
    let status = response.status();
    let text = response.text().await?;

    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            tracing::warn!(%status, error = %e, "Malformed success payload, treating as empty");
            return Ok(R::default());
        }
        Err(_) => {
            return Err(EngineError::Transport(format!(
                "unexpected {} response from server",
                status
            )));
        }
    };

    let envelope: Envelope = serde_json::from_value(value.clone()).unwrap_or_default();
    if envelope.is_error() || !status.is_success() {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        tracing::debug!(%status, %message, "Backend reported an error");
        return Err(EngineError::Backend { message });
    }

    match serde_json::from_value(value) {
        Ok(body) => Ok(body),
        Err(e) => {
            tracing::warn!(error = %e, "Unexpected success payload shape, treating as empty");
            Ok(R::default())
        }
    }
}

#[async_trait]
impl QueryBackend for AnalyticsClient {
    async fn columns_info(&self) -> Result<ColumnCatalog> {
        self.fetch_columns().await
    }

    async fn chart_data(&self, request: &ChartRequest) -> Result<ChartResponse> {
        self.fetch_chart(request).await
    }

    async fn pivot_data(&self, request: &PivotRequest) -> Result<PivotResponse> {
        self.fetch_pivot(request).await
    }

    async fn recast(&self, request: &RecastRequest) -> Result<()> {
        self.recast_columns(request).await
    }
}
