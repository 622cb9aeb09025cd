pub mod postgres;
pub mod schema;
pub mod session;
pub mod sqlite;

use std::path::PathBuf;

use crate::error::{HarnessError, Result};
use crate::models::{Row, SqlValue};

pub use session::{EntryKey, ListenerId, Mapping, Session, StatementInterceptor};

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Numbered placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }

    /// Comma-separated placeholders `start..start + count`.
    pub fn placeholders(self, start: usize, count: usize) -> String {
        (start..start + count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Largest number of bound parameters a single statement may carry.
    pub fn max_bind_params(self) -> usize {
        match self {
            Dialect::Sqlite => 32_766,
            Dialect::Postgres => 65_535,
        }
    }

    /// Column definition for a database-generated, never-reused identifier.
    pub fn identity_column(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Postgres => "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
        }
    }

    /// Column definition for an explicitly assigned identifier.
    pub fn key_column(self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY",
            Dialect::Postgres => "BIGINT PRIMARY KEY",
        }
    }

    pub fn timestamp_type(self) -> &'static str {
        match self {
            Dialect::Sqlite => "TEXT",
            Dialect::Postgres => "TIMESTAMPTZ",
        }
    }
}

/// A blocking connection to one database.
///
/// Transaction control (`BEGIN`/`COMMIT`/`ROLLBACK`) and DDL go through
/// [`Backend::execute_batch`]; everything else is a parameterized statement.
pub trait Backend {
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns no rows; yields the affected row count.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run a statement and collect every row it returns.
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run one or more unparameterized statements.
    fn execute_batch(&mut self, sql: &str) -> Result<()>;
}

/// Where a database URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    SqliteMemory,
    SqliteFile(PathBuf),
    Postgres(String),
}

impl DatabaseTarget {
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url == "sqlite::memory:" || url == "sqlite://:memory:" {
            return Ok(DatabaseTarget::SqliteMemory);
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(DatabaseTarget::Postgres(url.to_string()));
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"));
        match path {
            Some(path) if !path.is_empty() => Ok(DatabaseTarget::SqliteFile(PathBuf::from(path))),
            _ => Err(HarnessError::UnsupportedDatabaseUrl(url.to_string())),
        }
    }
}

impl std::fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::SqliteMemory => write!(f, "sqlite (in-memory)"),
            DatabaseTarget::SqliteFile(path) => write!(f, "sqlite ({})", path.display()),
            // Credentials stay out of logs
            DatabaseTarget::Postgres(_) => write!(f, "postgresql"),
        }
    }
}

/// Open a backend for the given database URL.
pub fn connect(url: &str) -> Result<Box<dyn Backend>> {
    let target = DatabaseTarget::parse(url)?;
    log::info!("Opening {} database", target);

    let backend: Box<dyn Backend> = match target {
        DatabaseTarget::SqliteMemory => Box::new(sqlite::SqliteBackend::open_in_memory()?),
        DatabaseTarget::SqliteFile(path) => Box::new(sqlite::SqliteBackend::open(&path)?),
        DatabaseTarget::Postgres(url) => Box::new(postgres::PostgresBackend::connect(&url)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_urls() {
        assert_eq!(
            DatabaseTarget::parse("sqlite::memory:").unwrap(),
            DatabaseTarget::SqliteMemory
        );
        assert_eq!(
            DatabaseTarget::parse("sqlite://data/bench.db").unwrap(),
            DatabaseTarget::SqliteFile(PathBuf::from("data/bench.db"))
        );
        assert_eq!(
            DatabaseTarget::parse("sqlite:bench.db").unwrap(),
            DatabaseTarget::SqliteFile(PathBuf::from("bench.db"))
        );
        assert!(matches!(
            DatabaseTarget::parse("postgresql://u:p@localhost/bench").unwrap(),
            DatabaseTarget::Postgres(_)
        ));
    }

    #[test]
    fn rejects_unknown_schemes() {
        for url in ["mysql://root@localhost/db", "sqlite://", "bench.db"] {
            let err = DatabaseTarget::parse(url).unwrap_err();
            assert!(matches!(err, HarnessError::UnsupportedDatabaseUrl(_)), "{url}");
        }
    }

    #[test]
    fn postgres_display_hides_credentials() {
        let target = DatabaseTarget::parse("postgres://admin:secret@db/bench").unwrap();
        assert_eq!(target.to_string(), "postgresql");
    }

    #[test]
    fn placeholders_follow_dialect() {
        assert_eq!(Dialect::Sqlite.placeholders(1, 3), "?1, ?2, ?3");
        assert_eq!(Dialect::Postgres.placeholders(4, 2), "$4, $5");
    }
}
