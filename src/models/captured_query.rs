use serde::Serialize;

use super::SqlValue;

/// One statement observed on its way to the database, with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedQuery {
    pub statement: String,
    pub parameters: Vec<SqlValue>,
}

impl CapturedQuery {
    pub fn new(statement: &str, parameters: &[SqlValue]) -> Self {
        CapturedQuery {
            statement: statement.to_string(),
            parameters: parameters.to_vec(),
        }
    }

    /// Leading SQL keyword, uppercased.
    pub fn verb(&self) -> String {
        self.statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase()
    }

    pub fn is_insert(&self) -> bool {
        self.verb() == "INSERT"
    }

    pub fn is_select(&self) -> bool {
        self.verb() == "SELECT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_leading_keyword() {
        let insert = CapturedQuery::new(
            "\n  insert into entries (description) VALUES (?1)",
            &[SqlValue::from("a")],
        );
        assert!(insert.is_insert());
        assert!(!insert.is_select());

        let select = CapturedQuery::new("SELECT id FROM entries", &[]);
        assert!(select.is_select());
        assert_eq!(select.verb(), "SELECT");
    }

    #[test]
    fn serializes_statement_and_parameters() {
        let query = CapturedQuery::new("SELECT id FROM entries WHERE id > ?1", &[SqlValue::Integer(4)]);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["statement"], "SELECT id FROM entries WHERE id > ?1");
        assert_eq!(json["parameters"][0], 4);
    }
}
