//! The five insert strategies and the driver that measures them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::schema::{self, Model};
use crate::db::{Mapping, Session};
use crate::error::{HarnessError, Result};
use crate::models::{CapturedQuery, Entry, HarnessSettings, SqlValue};
use crate::recorder::record_queries;
use crate::timer::measure_time;

/// Inserts one batch and returns the generated ids in creation order.
pub type StrategyFn = fn(&mut Session, &str, usize) -> Result<Vec<i64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStrategy {
    /// `add` + `commit` per row
    AddMultipleCommits,
    /// N `add` calls, one `commit`
    AddSingleCommit,
    /// One `add_all`, one `commit`
    AddAll,
    /// Untracked bulk save, ids re-queried
    BulkSaveObjects,
    /// Raw column mappings, ids re-queried
    BulkInsertMappings,
}

impl InsertStrategy {
    pub const ALL: [InsertStrategy; 5] = [
        InsertStrategy::AddMultipleCommits,
        InsertStrategy::AddSingleCommit,
        InsertStrategy::AddAll,
        InsertStrategy::BulkSaveObjects,
        InsertStrategy::BulkInsertMappings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InsertStrategy::AddMultipleCommits => "add_multiple_commits",
            InsertStrategy::AddSingleCommit => "add_single_commit",
            InsertStrategy::AddAll => "add_all",
            InsertStrategy::BulkSaveObjects => "bulk_save_objects",
            InsertStrategy::BulkInsertMappings => "bulk_insert_mappings",
        }
    }

    /// Whether ids are recovered by re-querying instead of from tracked objects.
    pub fn requeries_ids(&self) -> bool {
        matches!(
            self,
            InsertStrategy::BulkSaveObjects | InsertStrategy::BulkInsertMappings
        )
    }

    pub fn procedure(&self) -> StrategyFn {
        match self {
            InsertStrategy::AddMultipleCommits => insert_with_add_multiple_commits,
            InsertStrategy::AddSingleCommit => insert_with_add_single_commit,
            InsertStrategy::AddAll => insert_with_add_all,
            InsertStrategy::BulkSaveObjects => insert_with_bulk_save_objects,
            InsertStrategy::BulkInsertMappings => insert_with_bulk_insert_mappings,
        }
    }

    pub fn run(&self, session: &mut Session, batch_id: &str, rows: usize) -> Result<Vec<i64>> {
        (self.procedure())(session, batch_id, rows)
    }
}

impl std::fmt::Display for InsertStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for InsertStrategy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        InsertStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| HarnessError::UnknownStrategy(s.to_string()))
    }
}

pub fn description_for(batch_id: &str, index: usize) -> String {
    format!("{}-row-{}", batch_id, index)
}

/// Fresh random batch identifier (32 hex digits).
pub fn new_batch_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn new_entries(batch_id: &str, rows: usize) -> Vec<Entry> {
    (0..rows)
        .map(|index| Entry::new(description_for(batch_id, index)))
        .collect()
}

// ==================== Strategies ====================

fn insert_with_add_multiple_commits(
    db: &mut Session,
    batch_id: &str,
    rows: usize,
) -> Result<Vec<i64>> {
    let mut inserted_ids = Vec::with_capacity(rows);
    for index in 0..rows {
        let key = db.add(Entry::new(description_for(batch_id, index)));
        db.commit()?;
        inserted_ids.push(db.entry_id(key)?);
    }
    Ok(inserted_ids)
}

fn insert_with_add_single_commit(db: &mut Session, batch_id: &str, rows: usize) -> Result<Vec<i64>> {
    let mut keys = Vec::with_capacity(rows);
    for entry in new_entries(batch_id, rows) {
        keys.push(db.add(entry));
    }
    db.commit()?;

    keys.into_iter().map(|key| db.entry_id(key)).collect()
}

fn insert_with_add_all(db: &mut Session, batch_id: &str, rows: usize) -> Result<Vec<i64>> {
    let keys = db.add_all(new_entries(batch_id, rows));
    db.commit()?;

    keys.into_iter().map(|key| db.entry_id(key)).collect()
}

fn insert_with_bulk_save_objects(db: &mut Session, batch_id: &str, rows: usize) -> Result<Vec<i64>> {
    let last_id_before_insert = last_entry_id(db)?;

    let entries = new_entries(batch_id, rows);
    db.bulk_save_objects(&entries)?;
    db.commit()?;

    // Untracked inserts: the ids have to be fetched back
    ids_inserted_after(db, last_id_before_insert)
}

fn insert_with_bulk_insert_mappings(
    db: &mut Session,
    batch_id: &str,
    rows: usize,
) -> Result<Vec<i64>> {
    let last_id_before_insert = last_entry_id(db)?;

    let mappings: Vec<Mapping> = (0..rows)
        .map(|index| {
            let mut mapping = Mapping::new();
            mapping.insert(
                "description".to_string(),
                serde_json::Value::String(description_for(batch_id, index)),
            );
            mapping
        })
        .collect();
    db.bulk_insert_mappings::<Entry>(&mappings)?;
    db.commit()?;

    ids_inserted_after(db, last_id_before_insert)
}

/// Highest existing entry id, or 0 when the table is empty.
fn last_entry_id(db: &mut Session) -> Result<i64> {
    let sql = format!("SELECT id FROM {} ORDER BY id DESC LIMIT 1", Entry::TABLE);
    match db.query_scalar(&sql, &[])? {
        None | Some(SqlValue::Null) => Ok(0),
        Some(SqlValue::Integer(id)) => Ok(id),
        Some(_) => Err(HarnessError::UnexpectedValue {
            column: "id",
            expected: "integer",
        }),
    }
}

/// Racy under concurrent writers: anything inserted after `last_id` is returned.
fn ids_inserted_after(db: &mut Session, last_id: i64) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE id > {} ORDER BY id",
        Entry::TABLE,
        db.dialect().placeholder(1)
    );
    db.query(&sql, &[SqlValue::Integer(last_id)])?
        .iter()
        .map(|row| row.get_i64(0, "id"))
        .collect()
}

// ==================== Driver ====================

/// Outcome of one measured strategy run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertRun {
    pub strategy: InsertStrategy,
    pub batch_id: String,
    pub inserted_ids: Vec<i64>,
    pub queries: Vec<CapturedQuery>,
    pub elapsed_seconds: f64,
}

impl InsertRun {
    pub fn insert_statement_count(&self) -> usize {
        self.queries.iter().filter(|q| q.is_insert()).count()
    }

    pub fn first_id(&self) -> Option<i64> {
        self.inserted_ids.first().copied()
    }

    pub fn last_id(&self) -> Option<i64> {
        self.inserted_ids.last().copied()
    }
}

/// Run `strategy` with every statement recorded and the strategy itself timed.
pub fn run_insert_benchmark(
    session: &mut Session,
    strategy: InsertStrategy,
    batch_id: &str,
    rows: usize,
) -> Result<InsertRun> {
    let mut recording = record_queries(session);
    let (result, measurement) = measure_time(|_| strategy.run(&mut recording, batch_id, rows));
    let queries = recording.finish();
    let inserted_ids = result?;

    log::info!(
        "{} inserted {} rows with {} statements in {:.6}s",
        strategy,
        inserted_ids.len(),
        queries.len(),
        measurement.elapsed_seconds()
    );

    Ok(InsertRun {
        strategy,
        batch_id: batch_id.to_string(),
        inserted_ids,
        queries,
        elapsed_seconds: measurement.elapsed_seconds(),
    })
}

/// Resolve `strategy_name`, open a session and run one batch.
///
/// The strategy name is checked before the database is touched.
pub fn execute_insert_benchmark(
    strategy_name: &str,
    settings: &HarnessSettings,
    batch_id: Option<String>,
) -> Result<InsertRun> {
    let strategy: InsertStrategy = strategy_name.parse()?;
    let batch_id = batch_id.unwrap_or_else(new_batch_id);
    log::info!("Running {} with batch id {}", strategy, batch_id);

    let mut session = Session::open(&settings.database_url)?;
    schema::create_tables(&mut session)?;

    let run = run_insert_benchmark(&mut session, strategy, &batch_id, settings.rows_to_insert)?;
    session.close()?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_strategy_by_name() {
        for strategy in InsertStrategy::ALL {
            assert_eq!(strategy.name().parse::<InsertStrategy>().unwrap(), strategy);
            assert_eq!(strategy.to_string(), strategy.name());
        }
    }

    #[test]
    fn unknown_strategy_is_a_configuration_error() {
        let err = "does_not_exist".parse::<InsertStrategy>().unwrap_err();
        assert!(matches!(err, HarnessError::UnknownStrategy(ref s) if s == "does_not_exist"));
        assert!(err.is_configuration());
    }

    #[test]
    fn only_bulk_strategies_requery() {
        let requery: Vec<&str> = InsertStrategy::ALL
            .iter()
            .filter(|s| s.requeries_ids())
            .map(|s| s.name())
            .collect();
        assert_eq!(requery, vec!["bulk_save_objects", "bulk_insert_mappings"]);
    }

    #[test]
    fn descriptions_are_namespaced_by_batch() {
        assert_eq!(description_for("abc123", 0), "abc123-row-0");
        assert_eq!(description_for("abc123", 9), "abc123-row-9");
    }

    #[test]
    fn batch_ids_are_fresh_hex() {
        let a = new_batch_id();
        let b = new_batch_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn strategy_serializes_as_its_key() {
        let json = serde_json::to_string(&InsertStrategy::BulkInsertMappings).unwrap();
        assert_eq!(json, "\"bulk_insert_mappings\"");
    }

    #[test]
    fn last_entry_id_is_zero_on_empty_table() {
        let mut session = Session::open("sqlite::memory:").unwrap();
        schema::create_tables(&mut session).unwrap();
        assert_eq!(last_entry_id(&mut session).unwrap(), 0);
        assert!(ids_inserted_after(&mut session, 0).unwrap().is_empty());
    }
}
