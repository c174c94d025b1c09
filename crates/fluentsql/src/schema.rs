//! Table-existence cache.
//!
//! A [`SchemaCache`] is an ordinary value: whoever needs table lookups owns
//! one (or borrows it), and drops or invalidates it when the schema changes.

use std::collections::HashSet;

use crate::builder::table;
use crate::connection::Connection;
use crate::error::SqlResult;
use crate::predicate::Conditions;

const DEFAULT_SCHEMA: &str = "public";

/// Caches the table names of one database schema.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    schema: String,
    tables: Option<HashSet<String>>,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::for_schema(DEFAULT_SCHEMA)
    }
}

impl SchemaCache {
    /// Cache for the `public` schema.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: None,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Whether table names are currently cached.
    pub fn is_loaded(&self) -> bool {
        self.tables.is_some()
    }

    /// Replace the cache with the given names.
    ///
    /// Names are trimmed; empty names are skipped.
    pub fn load_from<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tables = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();
        self.tables = Some(tables);
    }

    /// Load table names from the connection unless already cached.
    pub fn preload<C: Connection>(&mut self, conn: &mut C) -> SqlResult<()> {
        if self.tables.is_none() {
            self.fetch(conn)?;
        }
        Ok(())
    }

    /// Whether `name` is a table of the schema. An empty name is never one.
    pub fn has_table<C: Connection>(&mut self, conn: &mut C, name: &str) -> SqlResult<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        self.preload(conn)?;
        Ok(self
            .tables
            .as_ref()
            .is_some_and(|tables| tables.contains(name)))
    }

    /// Forget cached names; the next lookup queries the connection again.
    pub fn invalidate(&mut self) {
        self.tables = None;
    }

    fn fetch<C: Connection>(&mut self, conn: &mut C) -> SqlResult<()> {
        let rows = table("information_schema.tables")
            .select("table_name::text AS table_name")
            .where_eq("table_schema", self.schema.as_str())
            .order_by("table_name", "ASC")
            .get(conn)?;

        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("table_name").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();
        tracing::debug!(schema = %self.schema, tables = names.len(), "schema cache loaded");
        self.load_from(names);
        Ok(())
    }
}
