//! Connection contract consumed by the builder's terminal operations.
//!
//! The builder never talks to a driver directly. It prepares a statement,
//! binds every value by name and executes it; rows come back as [`Row`]
//! mappings. Any store that can honour the two traits below can run the
//! queries this crate renders.

use crate::error::SqlResult;
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A prepared statement.
///
/// Names passed to [`bind_value`](Statement::bind_value) are the binding
/// names without the `:` prefix (`"p1"`, `"p2"`, ...).
pub trait Statement {
    /// Bind a value to the named placeholder.
    fn bind_value(&mut self, name: &str, value: &Value) -> SqlResult<()>;

    /// Execute the statement with the current bindings.
    fn execute(&mut self) -> SqlResult<()>;

    /// All remaining rows produced by the last `execute()`.
    fn fetch_all(&mut self) -> SqlResult<Vec<Row>>;

    /// The next row produced by the last `execute()`, if any.
    fn fetch(&mut self) -> SqlResult<Option<Row>>;

    /// Rows affected by the last `execute()`.
    fn row_count(&self) -> u64;
}

/// A blocking database connection.
pub trait Connection {
    /// Statement type; may borrow the connection.
    type Statement<'c>: Statement
    where
        Self: 'c;

    /// Prepare SQL containing `:name` placeholders.
    fn prepare(&mut self, sql: &str) -> SqlResult<Self::Statement<'_>>;

    /// Identifier generated by the most recent INSERT on this connection.
    fn last_insert_id(&mut self) -> SqlResult<String>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;

    fn begin_transaction(&mut self) -> SqlResult<()>;

    fn commit(&mut self) -> SqlResult<()>;

    fn rollback(&mut self) -> SqlResult<()>;
}

/// One result row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Row::new();
        for (column, value) in pairs {
            row.push(column, value);
        }
        row
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    /// Value of the first column with this name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let row = Row::from_pairs([("id", Value::Int(7)), ("name", Value::from("ann"))]);
        assert_eq!(row.get("name"), Some(&Value::from("ann")));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_index(0), Some(&Value::Int(7)));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn serializes_as_object() {
        let row = Row::from_pairs([("id", Value::Int(1)), ("email", Value::Null)]);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "email": null}));
    }
}
