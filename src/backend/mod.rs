//! Analytics backend access
//!
//! Structure:
//! - `client.rs`: HTTP client and response classification
//! - `columns.rs`: column metadata and dtype lookup
//! - `wire.rs`: request/response payloads
//! - `error.rs`: error types

pub mod client;
pub mod columns;
pub mod error;
pub mod wire;

pub use client::AnalyticsClient;
pub use columns::{ColumnCatalog, ColumnDescriptor, RecastTarget, SemanticType};
pub use error::{EngineError, Result, ValidationError};
