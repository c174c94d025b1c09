//! Fluent query builder.
//!
//! A [`QueryBuilder`] accumulates the intent of one logical query through
//! chained `&mut self` calls and turns it into SQL with `:pN` placeholders
//! only when a terminal operation runs.
//!
//! ## Design
//!
//! - Values are always bound, never inlined. Identifiers, operators and raw
//!   fragments are written as-is and must come from trusted code.
//! - The last kind-setting call (`select`, `insert*`, `update`, `delete`)
//!   decides which statement is rendered.
//! - UPDATE and DELETE without predicates render `WHERE 1=0`.

pub mod exec;
pub mod insert;
pub mod paginate;
pub mod render;

pub use insert::InsertPayload;
pub use paginate::Page;

use crate::binder::Binder;
use crate::config::BuilderConfig;
use crate::predicate::{Clause, Conditions, Connector};
use crate::value::Value;

/// Which statement the builder renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    kind: JoinKind,
    table: String,
    left: String,
    op: String,
    right: String,
}

/// Structured, parameter-safe query builder.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: Option<String>,
    alias: Option<String>,
    kind: StatementKind,
    /// SELECT columns (default ["*"])
    columns: Vec<String>,
    joins: Vec<Join>,
    wheres: Vec<Clause>,
    group_by: Vec<String>,
    having: Vec<Clause>,
    /// ORDER BY items, already suffixed with ASC/DESC
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    insert: Option<InsertPayload>,
    update: Vec<(String, Value)>,
    binder: Binder,
    config: BuilderConfig,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            table: None,
            alias: None,
            kind: StatementKind::Select,
            columns: vec!["*".to_string()],
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            insert: None,
            update: Vec::new(),
            binder: Binder::new(),
            config: BuilderConfig::default(),
        }
    }
}

/// Start a builder on `name`.
pub fn table(name: impl Into<String>) -> QueryBuilder {
    let mut qb = QueryBuilder::new();
    qb.table(name);
    qb
}

impl QueryBuilder {
    /// Create a builder with no table; one must be set before rendering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a custom configuration.
    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_config(&mut self, config: BuilderConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Set the target table and clear any alias.
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.table = Some(name.into());
        self.alias = None;
        self
    }

    /// Set the target table with an alias (used by SELECT only).
    pub fn table_as(&mut self, name: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.table = Some(name.into());
        self.alias = Some(alias.into());
        self
    }

    /// SELECT with a single column expression (string form, supports complex expressions).
    pub fn select(&mut self, cols: &str) -> &mut Self {
        self.kind = StatementKind::Select;
        self.columns = vec![cols.to_string()];
        self
    }

    /// SELECT with a list of columns.
    pub fn select_cols(&mut self, cols: &[&str]) -> &mut Self {
        self.kind = StatementKind::Select;
        self.columns = if cols.is_empty() {
            vec!["*".to_string()]
        } else {
            cols.iter().map(|c| c.to_string()).collect()
        };
        self
    }

    /// UPDATE with the given `column = value` assignments.
    pub fn update<I, K, V>(&mut self, data: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.kind = StatementKind::Update;
        self.update = data
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn delete(&mut self) -> &mut Self {
        self.kind = StatementKind::Delete;
        self
    }

    // ==================== Joins ====================

    pub fn join_with(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> &mut Self {
        self.joins.push(Join {
            kind,
            table: table.into(),
            left: left.into(),
            op: op.into(),
            right: right.into(),
        });
        self
    }

    /// Add INNER JOIN.
    pub fn join(
        &mut self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinKind::Inner, table, left, op, right)
    }

    /// Add LEFT JOIN.
    pub fn left_join(
        &mut self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinKind::Left, table, left, op, right)
    }

    /// Add RIGHT JOIN.
    pub fn right_join(
        &mut self,
        table: impl Into<String>,
        left: impl Into<String>,
        op: impl Into<String>,
        right: impl Into<String>,
    ) -> &mut Self {
        self.join_with(JoinKind::Right, table, left, op, right)
    }

    // ==================== Grouping / ordering ====================

    /// Append GROUP BY expressions.
    pub fn group_by(&mut self, cols: &[&str]) -> &mut Self {
        self.group_by.extend(cols.iter().map(|c| c.to_string()));
        self
    }

    /// Add `AND column op value` to HAVING.
    pub fn having(
        &mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_having(Connector::And, column.into(), op.into(), value.into())
    }

    /// Add `OR column op value` to HAVING.
    pub fn or_having(
        &mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push_having(Connector::Or, column.into(), op.into(), value.into())
    }

    fn push_having(
        &mut self,
        connector: Connector,
        column: String,
        op: String,
        value: Value,
    ) -> &mut Self {
        self.having.push(Clause::Compare {
            connector,
            column,
            op,
            value,
        });
        self
    }

    /// Add `ORDER BY column ASC|DESC`.
    ///
    /// Any direction other than `DESC` (case-insensitive) is treated as `ASC`.
    pub fn order_by(&mut self, column: &str, direction: &str) -> &mut Self {
        let direction = if direction.trim().eq_ignore_ascii_case("desc") {
            "DESC"
        } else {
            "ASC"
        };
        self.order_by.push(format!("{column} {direction}"));
        self
    }

    pub fn order_by_desc(&mut self, column: &str) -> &mut Self {
        self.order_by(column, "DESC")
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }
}

impl Conditions for QueryBuilder {
    fn clauses_mut(&mut self) -> &mut Vec<Clause> {
        &mut self.wheres
    }
}
