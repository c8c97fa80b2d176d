//! Report configuration and cross-filter engine
//!
//! Builds chart and pivot-table queries against an external analytics backend,
//! keeps them consistent with a shared set of cross-filters, and normalizes the
//! results into plot specifications and grids.
//!
//! Module organization:
//! - `backend`: HTTP client, wire payloads, column metadata, errors
//! - `report`: the engine proper
//! - `config`: engine configuration

pub mod backend;
pub mod config;
pub mod report;

pub use backend::{EngineError, Result};
pub use config::EngineConfig;
