//! Error taxonomy for the harness.

use thiserror::Error;

/// Everything that can abort a benchmark run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Insert strategy name not in the strategy table
    #[error("Invalid parameter: {0}")]
    UnknownStrategy(String),

    /// Relationship loading strategy name not recognized
    #[error("Invalid loading strategy: {0}")]
    UnknownLoadStrategy(String),

    /// Relationship loading scenario not recognized
    #[error("Invalid scenario: {0}")]
    UnknownScenario(String),

    /// Contact type outside home/work/other
    #[error("Invalid contact type: {0}")]
    InvalidContactType(String),

    /// Database URL with an unsupported scheme
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabaseUrl(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bulk mapping carried a key that is not an insertable column
    #[error("Column '{column}' is not mapped on table '{table}'")]
    UnmappedColumn { table: &'static str, column: String },

    /// Flush returned a different number of generated identifiers than rows
    #[error("Expected {expected} generated identifiers, got {got}")]
    IdentityMismatch { expected: usize, got: usize },

    /// Identifier requested for an entry that has not been flushed yet
    #[error("Entry has not been flushed; no identifier assigned")]
    Unflushed,

    /// A column held a value of the wrong shape
    #[error("Unexpected value in column '{column}': expected {expected}")]
    UnexpectedValue {
        column: &'static str,
        expected: &'static str,
    },
}

impl HarnessError {
    /// Whether this error was caused by bad input rather than by the database.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarnessError::UnknownStrategy(_)
                | HarnessError::UnknownLoadStrategy(_)
                | HarnessError::UnknownScenario(_)
                | HarnessError::InvalidContactType(_)
                | HarnessError::UnsupportedDatabaseUrl(_)
        )
    }

    /// Process exit code: 2 for configuration errors, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            2
        } else {
            1
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
