use thiserror::Error;

/// Text shown to the user for any transport-level failure
pub const CANNOT_REACH_SERVER: &str = "cannot reach server";

/// Errors that can occur while configuring or dispatching report queries
#[derive(Debug, Error)]
pub enum EngineError {
    /// Local pre-dispatch failure, never reaches the network
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Network unreachable or malformed transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Well-formed error payload from the aggregation service
    #[error("{message}")]
    Backend { message: String },

    /// Configuration error (missing env vars, invalid URIs, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Preferences file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload (de)serialization outside the HTTP layer
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Message surfaced to the user for this error
    ///
    /// Validation and backend messages are shown verbatim, transport
    /// failures collapse to a generic connectivity message.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation(e) => e.to_string(),
            EngineError::Backend { message } => message.clone(),
            EngineError::Transport(_) => CANNOT_REACH_SERVER.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

/// Configuration problems caught before any request is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("X required")]
    XRequired,

    #[error("chart kind '{kind}' is not valid for the selected columns")]
    KindNotAllowed { kind: String },

    #[error("rows required")]
    RowsRequired,

    #[error("values required")]
    ValuesRequired,

    #[error("non-numeric value field requires count aggregator: {}", .columns.join(", "))]
    NonNumericValueField { columns: Vec<String> },

    #[error("duplicate field: {column}")]
    DuplicateField { column: String },

    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("column '{column}' is not a value field")]
    NotAValueField { column: String },

    #[error("no dataset loaded")]
    NoDataset,
}

/// Type alias for Results using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
