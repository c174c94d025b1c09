//! Error types for fluentsql

use thiserror::Error;

/// Result type alias for fluentsql operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for building and executing queries.
///
/// The first group of variants describes builder misuse and is always raised
/// before any SQL reaches the connection. The second group wraps operational
/// failures reported by the connection.
#[derive(Debug, Error)]
pub enum SqlError {
    /// No table was set before rendering
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The operation does not apply to the builder's statement kind
    #[error("Statement kind error: {0}")]
    StatementKind(String),

    /// INSERT or UPDATE rendered without a payload
    #[error("Data missing: {0}")]
    DataMissing(String),

    /// A multi-row INSERT row does not match the declared column count.
    ///
    /// `expected` is 0 when `values()` is called before any columns were declared.
    #[error("Arity mismatch: expected {expected} value(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// `insert_row()` was given a row without one of the declared columns
    #[error("Missing value for column '{0}' in insert_row()")]
    MissingColumn(String),

    /// Predicate group markers are not balanced
    #[error("Unbalanced predicate groups: {0}")]
    GroupingImbalance(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error reported by a connection
    #[error("Query error: {0}")]
    Query(String),

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// PostgreSQL driver error
    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a statement kind error
    pub fn statement_kind(message: impl Into<String>) -> Self {
        Self::StatementKind(message.into())
    }

    /// Create a data missing error
    pub fn data_missing(message: impl Into<String>) -> Self {
        Self::DataMissing(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Whether this error was raised by the builder itself (programmer error)
    /// rather than by the connection.
    pub fn is_builder_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::StatementKind(_)
                | Self::DataMissing(_)
                | Self::ArityMismatch { .. }
                | Self::MissingColumn(_)
                | Self::GroupingImbalance(_)
        )
    }

    /// Check if this is an arity mismatch error
    pub fn is_arity_mismatch(&self) -> bool {
        matches!(self, Self::ArityMismatch { .. })
    }
}
