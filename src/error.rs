//! Error types for the importer.

use thiserror::Error;

/// The main error type for extraction passes.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Invalid caller configuration, rejected before the source is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The per-build tables for the requested dbSNP build are absent.
    #[error("dbSNP build {build} does not exist")]
    BuildNotFound { build: u32 },

    /// A build-independent relation is missing, e.g. a wrong shared schema.
    #[error("Source relation missing: {0}")]
    MissingRelation(String),

    /// Any other failure talking to the relational source.
    #[error("Source error: {0}")]
    Source(#[source] sqlx::Error),

    /// A row lacks a column that can never be NULL in a consistent source.
    #[error("Missing required column '{column}' (ss_id: {ss_id:?})")]
    MissingField {
        column: &'static str,
        ss_id: Option<i64>,
    },

    /// `loc_type` holds a code outside the known set.
    #[error("Unknown loc_type {code} for ss{ss_id}")]
    UnknownLocusType { code: i32, ss_id: i64 },

    /// An HGVS projection has its string but not its coordinates.
    #[error("Partially populated HGVS-{group} projection for ss{ss_id}")]
    PartialHgvs { group: char, ss_id: i64 },

    /// The sink could not accept a chunk.
    #[error("Sink error: {0}")]
    Sink(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing column error.
    pub fn missing(column: &'static str, ss_id: Option<i64>) -> Self {
        Self::MissingField { column, ss_id }
    }

    /// True for errors raised while mapping a row, as opposed to talking to the source.
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::UnknownLocusType { .. } | Self::PartialHgvs { .. }
        )
    }
}

/// Errors reported by a [`RowSource`](crate::source::RowSource).
///
/// Sources only distinguish a missing relation from everything else; the
/// reader decides what a missing relation means.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A relation referenced by the query does not exist.
    #[error("relation does not exist: {0}")]
    MissingRelation(String),

    /// Database error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Result type alias for importer operations.
pub type ImportResult<T> = Result<T, ImportError>;
