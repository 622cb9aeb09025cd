//! Unit-of-work session over a [`Backend`].
//!
//! The session autobegins a transaction on the first statement, tracks
//! entries added to it until they are flushed, and passes every statement
//! through its registered [`StatementInterceptor`]s before the backend
//! sees it.

use std::rc::Rc;

use super::schema::Model;
use super::{Backend, Dialect};
use crate::error::{HarnessError, Result};
use crate::models::{Entry, Row, SqlValue};

/// Observes each statement just before it executes.
pub trait StatementInterceptor {
    fn before_execute(&self, statement: &str, parameters: &[SqlValue]);
}

/// Handle returned by [`Session::listen`], used to remove the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Handle to an entry tracked by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey(usize);

/// Raw column-name to value row for [`Session::bulk_insert_mappings`].
pub type Mapping = serde_json::Map<String, serde_json::Value>;

pub struct Session {
    backend: Box<dyn Backend>,
    interceptors: Vec<(ListenerId, Rc<dyn StatementInterceptor>)>,
    next_listener: u64,
    /// Every entry added through this session, indexed by `EntryKey`
    tracked: Vec<Entry>,
    /// Indices into `tracked` awaiting flush
    pending: Vec<usize>,
    in_transaction: bool,
}

impl Session {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Session {
            backend,
            interceptors: Vec::new(),
            next_listener: 0,
            tracked: Vec::new(),
            pending: Vec::new(),
            in_transaction: false,
        }
    }

    /// Connect to `database_url` and wrap the backend in a fresh session.
    pub fn open(database_url: &str) -> Result<Self> {
        Ok(Session::new(super::connect(database_url)?))
    }

    /// Install an interceptor for the whole life of the session.
    pub fn with_interceptor(mut self, interceptor: Rc<dyn StatementInterceptor>) -> Self {
        self.listen(interceptor);
        self
    }

    pub fn listen(&mut self, interceptor: Rc<dyn StatementInterceptor>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.interceptors.push((id, interceptor));
        id
    }

    /// Returns false if the listener was already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.interceptors.len();
        self.interceptors.retain(|(listener, _)| *listener != id);
        self.interceptors.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.interceptors.len()
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    // ==================== Unit of work ====================

    /// Track a new entry; it is inserted on the next flush.
    pub fn add(&mut self, entry: Entry) -> EntryKey {
        let index = self.tracked.len();
        self.tracked.push(entry);
        self.pending.push(index);
        EntryKey(index)
    }

    pub fn add_all<I>(&mut self, entries: I) -> Vec<EntryKey>
    where
        I: IntoIterator<Item = Entry>,
    {
        entries.into_iter().map(|entry| self.add(entry)).collect()
    }

    pub fn entry(&self, key: EntryKey) -> Option<&Entry> {
        self.tracked.get(key.0)
    }

    /// Identifier of a tracked entry; fails until the entry has been flushed.
    pub fn entry_id(&self, key: EntryKey) -> Result<i64> {
        self.entry(key)
            .and_then(|entry| entry.id)
            .ok_or(HarnessError::Unflushed)
    }

    /// Insert all pending entries and assign their generated identifiers.
    ///
    /// On failure the open transaction is rolled back and the pending
    /// entries are discarded, so nothing from the failed flush is retried.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let rows: Vec<Vec<SqlValue>> = pending
            .iter()
            .map(|&index| self.tracked[index].values())
            .collect();

        let inserted = self
            .insert_rows(Entry::TABLE, Entry::COLUMNS, &rows, true)
            .and_then(|ids| {
                if ids.len() == pending.len() {
                    Ok(ids)
                } else {
                    Err(HarnessError::IdentityMismatch {
                        expected: pending.len(),
                        got: ids.len(),
                    })
                }
            });

        // Earlier chunks may already be in the transaction; none of it survives
        let ids = match inserted {
            Ok(ids) => ids,
            Err(e) => {
                if let Err(rollback_err) = self.rollback() {
                    log::warn!("Failed to roll back after failed flush: {}", rollback_err);
                }
                return Err(e);
            }
        };

        // Identifiers ascend in insertion order
        for (&index, id) in pending.iter().zip(ids) {
            self.tracked[index].id = Some(id);
        }
        Ok(())
    }

    /// Flush, then commit the open transaction if there is one.
    pub fn commit(&mut self) -> Result<()> {
        self.flush()?;
        if self.in_transaction {
            self.in_transaction = false;
            self.backend.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Discard pending entries and roll back the open transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.pending.clear();
        if self.in_transaction {
            self.in_transaction = false;
            self.backend.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Roll back anything still open and release the connection.
    pub fn close(mut self) -> Result<()> {
        self.rollback()
    }

    // ==================== Bulk operations ====================

    /// Insert objects without tracking them; generated ids are not read back.
    pub fn bulk_save_objects<M: Model>(&mut self, objects: &[M]) -> Result<u64> {
        let rows: Vec<Vec<SqlValue>> = objects.iter().map(|object| object.values()).collect();
        self.insert_rows(M::TABLE, M::COLUMNS, &rows, false)?;
        Ok(rows.len() as u64)
    }

    /// Insert raw column-name to value mappings for model `M`.
    ///
    /// Keys must be insertable columns of `M`. Missing columns take the
    /// model's client-side default, or NULL when it has none.
    pub fn bulk_insert_mappings<M: Model>(&mut self, mappings: &[Mapping]) -> Result<u64> {
        let mut rows = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            if let Some(column) = mapping
                .keys()
                .find(|key| !M::COLUMNS.contains(&key.as_str()))
            {
                return Err(HarnessError::UnmappedColumn {
                    table: M::TABLE,
                    column: column.clone(),
                });
            }

            let row: Vec<SqlValue> = M::COLUMNS
                .iter()
                .map(|column| match mapping.get(*column) {
                    Some(value) => SqlValue::from_json(value),
                    None => M::column_default(column).unwrap_or(SqlValue::Null),
                })
                .collect();
            rows.push(row);
        }

        self.insert_rows(M::TABLE, M::COLUMNS, &rows, false)?;
        Ok(rows.len() as u64)
    }

    // ==================== Statements ====================

    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.begin_if_needed()?;
        self.notify(sql, params);
        self.backend.execute(sql, params)
    }

    /// Run a query, flushing pending entries first so it sees them.
    pub fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.flush()?;
        self.begin_if_needed()?;
        self.notify(sql, params);
        self.backend.query(sql, params)
    }

    /// First column of the first row, or `None` when no rows come back.
    pub fn query_scalar(&mut self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>> {
        let rows = self.query(sql, params)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next()))
    }

    /// Run unparameterized DDL outside the unit of work.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.notify(sql, &[]);
        self.backend.execute_batch(sql)
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.backend.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn notify(&self, sql: &str, params: &[SqlValue]) {
        for (_, interceptor) in &self.interceptors {
            interceptor.before_execute(sql, params);
        }
    }

    /// Multi-row INSERT, split only when the dialect's bind limit requires it.
    /// Returns the generated ids in ascending order when `returning` is set.
    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
        returning: bool,
    ) -> Result<Vec<i64>> {
        let dialect = self.dialect();
        let rows_per_statement = (dialect.max_bind_params() / columns.len().max(1)).max(1);

        let mut ids = Vec::new();
        for chunk in rows.chunks(rows_per_statement) {
            let sql = insert_statement(dialect, table, columns, chunk.len(), returning);
            let params: Vec<SqlValue> = chunk.iter().flatten().cloned().collect();
            if returning {
                for row in self.query(&sql, &params)? {
                    ids.push(row.get_i64(0, "id")?);
                }
            } else {
                self.execute(&sql, &params)?;
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction {
            self.in_transaction = false;
            log::debug!("Rolling back transaction left open by dropped session");
            if let Err(e) = self.backend.execute_batch("ROLLBACK") {
                log::warn!("Failed to roll back open transaction: {}", e);
            }
        }
    }
}

/// `INSERT INTO table (cols) VALUES (..), (..) [RETURNING id]`
pub(crate) fn insert_statement(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    row_count: usize,
    returning: bool,
) -> String {
    let width = columns.len();
    let tuples: Vec<String> = (0..row_count)
        .map(|row| format!("({})", dialect.placeholders(row * width + 1, width)))
        .collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        tuples.join(", ")
    );
    if returning {
        sql.push_str(" RETURNING id");
    }
    sql
}
