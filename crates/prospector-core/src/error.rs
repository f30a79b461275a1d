//! Unified error types for Prospector

use thiserror::Error;

/// Unified error type for all Prospector operations
///
/// Only [`ProspectorError::Auth`] terminates a run. Every other variant is
/// contained to the query, card or step that produced it and surfaces through
/// the run's log stream.
#[derive(Error, Debug)]
pub enum ProspectorError {
    // Run-level errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Query '{query}' failed: {reason}")]
    Query { query: String, reason: String },

    // Page-level errors
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Action failed: {0}")]
    Action(String),

    #[error("Browser channel error: {0}")]
    Channel(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // Persistence errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Export error: {0}")]
    Export(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl ProspectorError {
    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Wrap any error as a query-scoped failure
    pub fn query(query: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Query {
            query: query.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using ProspectorError
pub type Result<T> = std::result::Result<T, ProspectorError>;
