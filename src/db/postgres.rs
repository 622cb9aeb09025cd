use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Postgres, Row as _, TypeInfo, ValueRef};
use tokio::runtime::Runtime;

use super::{Backend, Dialect};
use crate::error::Result;
use crate::models::{Row, SqlValue};

/// Backend over a single PostgreSQL connection.
///
/// sqlx is async; this backend owns a current-thread runtime and blocks on
/// every call so the harness stays synchronous.
pub struct PostgresBackend {
    runtime: Runtime,
    conn: PgConnection,
}

impl PostgresBackend {
    pub fn connect(url: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let conn = runtime.block_on(PgConnection::connect(url))?;
        Ok(PostgresBackend { runtime, conn })
    }
}

impl Backend for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let query = bind_all(sqlx::query(sql), params);
        let result = self.runtime.block_on(query.execute(&mut self.conn))?;
        Ok(result.rows_affected())
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let query = bind_all(sqlx::query(sql), params);
        let rows = self.runtime.block_on(query.fetch_all(&mut self.conn))?;
        rows.iter().map(decode_row).collect()
    }

    fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(&mut self.conn))?;
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = match value {
            // NULL binds are typed int8; the only nullable column is users.company_id
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Timestamp(ts) => query.bind(*ts),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Row> {
    let mut values = Vec::with_capacity(row.columns().len());
    for (index, column) in row.columns().iter().enumerate() {
        values.push(decode_value(row, index, column.type_info().name())?);
    }
    Ok(Row::new(values))
}

fn decode_value(row: &PgRow, index: usize, type_name: &str) -> Result<SqlValue> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let value = match type_name {
        "INT8" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
        "INT4" => SqlValue::Integer(i64::from(row.try_get::<i32, _>(index)?)),
        "INT2" => SqlValue::Integer(i64::from(row.try_get::<i16, _>(index)?)),
        "BOOL" => SqlValue::Integer(i64::from(row.try_get::<bool, _>(index)?)),
        "FLOAT4" => SqlValue::Real(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => SqlValue::Real(row.try_get::<f64, _>(index)?),
        "TIMESTAMPTZ" => SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?),
        // TEXT, VARCHAR, BPCHAR, NAME
        _ => SqlValue::Text(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}
