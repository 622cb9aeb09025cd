use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://querybench.db";
pub const DEFAULT_ROWS_TO_INSERT: usize = 10;

/// Environment variable consulted when `--database-url` is not given.
pub const DATABASE_URL_ENV: &str = "QUERYBENCH_DATABASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarnessSettings {
    /// `sqlite::memory:`, `sqlite://<path>` or `postgres://...`
    pub database_url: String,
    /// Rows per batch
    pub rows_to_insert: usize,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        HarnessSettings {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            rows_to_insert: DEFAULT_ROWS_TO_INSERT,
        }
    }
}

impl HarnessSettings {
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        HarnessSettings {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ten_rows_in_local_sqlite_file() {
        let settings = HarnessSettings::default();
        assert_eq!(settings.rows_to_insert, 10);
        assert_eq!(settings.database_url, "sqlite://querybench.db");
    }

    #[test]
    fn camel_case_json_needs_both_fields() {
        let parsed: HarnessSettings =
            serde_json::from_str(r#"{"databaseUrl":"sqlite::memory:","rowsToInsert":3}"#).unwrap();
        assert_eq!(parsed.rows_to_insert, 3);
        assert!(serde_json::from_str::<HarnessSettings>(r#"{"databaseUrl":"x"}"#).is_err());
    }
}
