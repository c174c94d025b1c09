//! Terminal operations that execute against a [`Connection`].

use super::{QueryBuilder, StatementKind};
use crate::binder::Binder;
use crate::connection::{Connection, Row, Statement};
use crate::error::{SqlError, SqlResult};
use crate::log;
use crate::transaction;
use crate::value::Value;

pub(crate) const COUNT_COLUMN: &str = "cnt";

/// Render-affecting state saved around derived count queries.
///
/// The binder is only captured for a full snapshot; otherwise placeholder
/// numbers issued while the snapshot is held stay issued.
pub(super) struct Snapshot {
    binder: Option<Binder>,
    columns: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    /// Render, prepare, bind and execute; returns the executed statement.
    pub fn run<'c, C: Connection>(&mut self, conn: &'c mut C) -> SqlResult<C::Statement<'c>> {
        let sql = self.to_sql()?;
        self.execute_sql(conn, &sql)
    }

    /// All rows.
    pub fn get<C: Connection>(&mut self, conn: &mut C) -> SqlResult<Vec<Row>> {
        let mut stmt = self.run(conn)?;
        stmt.fetch_all()
    }

    /// The first row, or `None`.
    ///
    /// Renders `LIMIT 1` when no limit is set; the limit is unset again
    /// afterwards.
    pub fn first<C: Connection>(&mut self, conn: &mut C) -> SqlResult<Option<Row>> {
        let implicit = self.limit.is_none();
        if implicit {
            self.limit = Some(1);
        }
        let result = self.run(conn).and_then(|mut stmt| stmt.fetch());
        if implicit {
            self.limit = None;
        }
        result
    }

    /// A column of the first row. SQL NULL and a missing row are both `None`.
    pub fn value<C: Connection>(&mut self, conn: &mut C, column: &str) -> SqlResult<Option<Value>> {
        let row = self.first(conn)?;
        Ok(row
            .and_then(|r| r.get(column).cloned())
            .filter(|v| !v.is_null()))
    }

    /// Number of rows the SELECT would return, ignoring ordering, limit and
    /// offset. Columns, ordering, limit and offset are left as they were; the
    /// placeholder counter keeps the numbers the count query used.
    pub fn count<C: Connection>(&mut self, conn: &mut C) -> SqlResult<u64> {
        self.derived_count(conn)
    }

    /// Execute and return the affected-row count.
    pub fn execute<C: Connection>(&mut self, conn: &mut C) -> SqlResult<u64> {
        let stmt = self.run(conn)?;
        Ok(stmt.row_count())
    }

    /// Execute an INSERT and return the generated identifier.
    pub fn insert_get_id<C: Connection>(&mut self, conn: &mut C) -> SqlResult<String> {
        if self.kind != StatementKind::Insert {
            return Err(SqlError::statement_kind(format!(
                "insert_get_id() requires an insert, builder is a {}",
                self.kind.as_str()
            )));
        }
        drop(self.run(&mut *conn)?);
        conn.last_insert_id()
    }

    /// Run `f` inside a transaction on `conn`.
    ///
    /// See [`transaction::transactional`]; an already open transaction is
    /// reused, not nested.
    pub fn transactional<C, T, E, F>(&mut self, conn: &mut C, f: F) -> Result<T, E>
    where
        C: Connection,
        E: From<SqlError> + std::fmt::Display,
        F: FnOnce(&mut QueryBuilder, &mut C) -> Result<T, E>,
    {
        transaction::transactional(conn, |conn| f(self, conn))
    }

    /// COUNT(*) derived from the current SELECT.
    ///
    /// Grouped queries are counted through a subquery. Columns, ordering,
    /// limit and offset are restored whatever the outcome.
    pub(crate) fn derived_count<C: Connection>(&mut self, conn: &mut C) -> SqlResult<u64> {
        if self.kind != StatementKind::Select {
            return Err(SqlError::statement_kind(format!(
                "count requires a select, builder is a {}",
                self.kind.as_str()
            )));
        }
        let saved = self.shape_snapshot();
        let result = self.count_rows(conn);
        self.restore(saved);
        result
    }

    fn count_rows<C: Connection>(&mut self, conn: &mut C) -> SqlResult<u64> {
        self.order_by.clear();
        self.limit = None;
        self.offset = None;

        let sql = if !self.group_by.is_empty() || !self.having.is_empty() {
            let inner = self.to_sql()?;
            format!("SELECT COUNT(*) AS {COUNT_COLUMN} FROM ({inner}) AS _sub")
        } else {
            self.columns = vec![format!("COUNT(*) AS {COUNT_COLUMN}")];
            self.to_sql()?
        };

        let mut stmt = self.execute_sql(conn, &sql)?;
        let total = stmt
            .fetch()?
            .and_then(|row| row.get(COUNT_COLUMN).and_then(Value::as_i64))
            .unwrap_or(0);
        Ok(u64::try_from(total).unwrap_or(0))
    }

    /// Everything, binder included.
    pub(super) fn snapshot(&self) -> Snapshot {
        Snapshot {
            binder: Some(self.binder.clone()),
            ..self.shape_snapshot()
        }
    }

    fn shape_snapshot(&self) -> Snapshot {
        Snapshot {
            binder: None,
            columns: self.columns.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub(super) fn restore(&mut self, saved: Snapshot) {
        if let Some(binder) = saved.binder {
            self.binder = binder;
        }
        self.columns = saved.columns;
        self.order_by = saved.order_by;
        self.limit = saved.limit;
        self.offset = saved.offset;
    }

    fn execute_sql<'c, C: Connection>(
        &self,
        conn: &'c mut C,
        sql: &str,
    ) -> SqlResult<C::Statement<'c>> {
        let bindings = self.binder.bindings();
        log::log_sql(&self.config, self.kind.as_str(), sql, bindings.len());

        let mut stmt = conn.prepare(sql)?;
        for (name, value) in bindings {
            stmt.bind_value(name, value)?;
        }
        stmt.execute()?;
        Ok(stmt)
    }
}
