//! INSERT payloads.
//!
//! Two entry points, two shapes: [`QueryBuilder::insert`] takes one row of
//! `(column, value)` pairs, [`QueryBuilder::insert_columns`] declares the
//! columns of a multi-row insert whose rows are added with
//! [`QueryBuilder::values`].

use super::{QueryBuilder, StatementKind};
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Pending INSERT data.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertPayload {
    /// One row; column order is preserved.
    Row(Vec<(String, Value)>),
    /// Declared columns and rows, each row as wide as `columns`.
    Columns {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

impl QueryBuilder {
    /// Single-row INSERT from `(column, value)` pairs.
    pub fn insert<I, K, V>(&mut self, row: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.kind = StatementKind::Insert;
        let row = row
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert = Some(InsertPayload::Row(row));
        self
    }

    /// Multi-row INSERT: declare the columns, then add rows with `values()`.
    pub fn insert_columns(&mut self, columns: &[&str]) -> &mut Self {
        self.kind = StatementKind::Insert;
        self.insert = Some(InsertPayload::Columns {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        });
        self
    }

    /// Add one row in declared column order.
    ///
    /// Fails with [`SqlError::ArityMismatch`] when the row width differs from
    /// the column count, or (with `expected = 0`) when no columns were
    /// declared.
    pub fn values<I>(&mut self, row: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let row: Vec<Value> = row.into_iter().map(Into::into).collect();
        let inserting = self.kind == StatementKind::Insert;
        match &mut self.insert {
            Some(InsertPayload::Columns { columns, rows }) if inserting && !columns.is_empty() =>
            {
                if row.len() != columns.len() {
                    return Err(SqlError::ArityMismatch {
                        expected: columns.len(),
                        got: row.len(),
                    });
                }
                rows.push(row);
                Ok(self)
            }
            _ => Err(SqlError::ArityMismatch {
                expected: 0,
                got: row.len(),
            }),
        }
    }

    /// Add a row given as `(column, value)` pairs.
    ///
    /// The first call fixes the column order; later rows are matched by
    /// column name (extra names are ignored, a missing one is
    /// [`SqlError::MissingColumn`]). If a single-row payload from `insert()`
    /// is pending, the row replaces it instead.
    pub fn insert_row<I, K, V>(&mut self, row: I) -> SqlResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.kind = StatementKind::Insert;
        let row: Vec<(String, Value)> = row
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        match &mut self.insert {
            Some(InsertPayload::Row(pending)) if !pending.is_empty() => {
                *pending = row;
            }
            Some(InsertPayload::Columns { columns, rows }) if !columns.is_empty() => {
                let mut ordered = Vec::with_capacity(columns.len());
                for column in columns.iter() {
                    let value = row
                        .iter()
                        .find(|(name, _)| name == column)
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| SqlError::MissingColumn(column.clone()))?;
                    ordered.push(value);
                }
                rows.push(ordered);
            }
            _ => {
                let (columns, values) = row.into_iter().unzip();
                self.insert = Some(InsertPayload::Columns {
                    columns,
                    rows: vec![values],
                });
            }
        }
        Ok(self)
    }

    pub fn insert_payload(&self) -> Option<&InsertPayload> {
        self.insert.as_ref()
    }
}
