//! Table mappings for the models and the DDL that creates their tables.

use chrono::Utc;

use super::{Dialect, Session};
use crate::error::Result;
use crate::models::{Company, Email, Entry, PhoneNumber, SqlValue, User};

/// Maps a model type onto a table.
pub trait Model {
    const TABLE: &'static str;

    /// Insertable columns, in the order [`Model::values`] yields them.
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<SqlValue>;

    /// Client-side default for a column missing from a bulk mapping.
    fn column_default(_column: &str) -> Option<SqlValue> {
        None
    }
}

impl Model for Entry {
    const TABLE: &'static str = "entries";
    const COLUMNS: &'static [&'static str] = &["description", "created_at"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.description.as_str()),
            SqlValue::from(self.created_at),
        ]
    }

    fn column_default(column: &str) -> Option<SqlValue> {
        match column {
            "created_at" => Some(SqlValue::from(Utc::now())),
            _ => None,
        }
    }
}

impl Model for Company {
    const TABLE: &'static str = "companies";
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(self.id), SqlValue::from(self.name.as_str())]
    }
}

impl Model for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "name", "company_id"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.id),
            SqlValue::from(self.name.as_str()),
            SqlValue::from(self.company_id),
        ]
    }
}

impl Model for Email {
    const TABLE: &'static str = "emails";
    const COLUMNS: &'static [&'static str] = &["id", "type", "email", "user_id"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.id),
            SqlValue::from(self.kind.as_str()),
            SqlValue::from(self.email.as_str()),
            SqlValue::from(self.user_id),
        ]
    }
}

impl Model for PhoneNumber {
    const TABLE: &'static str = "phone_numbers";
    const COLUMNS: &'static [&'static str] = &["id", "type", "phone_number", "user_id"];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(self.id),
            SqlValue::from(self.kind.as_str()),
            SqlValue::from(self.phone_number.as_str()),
            SqlValue::from(self.user_id),
        ]
    }
}

/// `CREATE TABLE IF NOT EXISTS` for every mapped table.
pub fn ddl(dialect: Dialect) -> String {
    let identity = dialect.identity_column();
    let key = dialect.key_column();
    let timestamp = dialect.timestamp_type();

    format!(
        r#"
        -- Benchmark rows
        CREATE TABLE IF NOT EXISTS entries (
            id {identity},
            description VARCHAR(100) NOT NULL CHECK (length(description) <= 100),
            created_at {timestamp} NOT NULL
        );

        -- Relationship loading fixture
        CREATE TABLE IF NOT EXISTS companies (
            id {key},
            name VARCHAR(100) NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id {key},
            name VARCHAR(100) NOT NULL,
            company_id BIGINT REFERENCES companies(id)
        );

        CREATE TABLE IF NOT EXISTS emails (
            id {key},
            type VARCHAR(5) NOT NULL CHECK (type IN ('home', 'work', 'other')),
            email VARCHAR(255) NOT NULL,
            user_id BIGINT NOT NULL REFERENCES users(id)
        );

        CREATE TABLE IF NOT EXISTS phone_numbers (
            id {key},
            type VARCHAR(5) NOT NULL CHECK (type IN ('home', 'work', 'other')),
            phone_number VARCHAR(50) NOT NULL,
            user_id BIGINT NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_users_company_id ON users (company_id);
        CREATE INDEX IF NOT EXISTS idx_emails_user_id ON emails (user_id);
        CREATE INDEX IF NOT EXISTS idx_phone_numbers_user_id ON phone_numbers (user_id);
        "#
    )
}

/// Create all tables if they don't exist yet.
pub fn create_tables(session: &mut Session) -> Result<()> {
    let sql = ddl(session.dialect());
    session.execute_batch(&sql)
}
