//! WHERE/HAVING clause lists and their compilation.
//!
//! Predicates, raw fragments and group markers live in one flat, ordered
//! list. Grouping is expressed with `Open`/`Close` markers instead of nested
//! trees, which keeps the list shared between the builder and any
//! [`WhereGroup`] handle it lends out.

use crate::binder::Binder;
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Boolean connector placed in front of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One entry of a WHERE or HAVING list.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `column op :pN`
    Compare {
        connector: Connector,
        column: String,
        op: String,
        value: Value,
    },
    /// `column [NOT] IN (:pN, ...)`; never empty.
    InList {
        connector: Connector,
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Literal SQL, not parameterized.
    Raw { connector: Connector, sql: String },
    /// Opens a parenthesized group.
    Open { connector: Connector },
    /// Closes the innermost group.
    Close,
}

/// Compile a clause list into a boolean expression.
///
/// The result never starts with a connector, and the first clause inside a
/// group is written without its connector. An empty list compiles to an
/// empty string; callers decide whether that means "no WHERE" or a guard.
pub fn compile(clauses: &[Clause], binder: &mut Binder) -> SqlResult<String> {
    let mut out = String::new();
    let mut after_open = true;
    let mut depth = 0usize;

    for clause in clauses {
        match clause {
            Clause::Open { connector } => {
                let part = if after_open {
                    "(".to_string()
                } else {
                    format!("{} (", connector.as_str())
                };
                push_part(&mut out, &part);
                after_open = true;
                depth += 1;
            }
            Clause::Close => {
                if depth == 0 {
                    return Err(SqlError::GroupingImbalance(
                        "group closed without a matching open".to_string(),
                    ));
                }
                if after_open {
                    // empty group
                    push_part(&mut out, "1=1");
                }
                out.push(')');
                after_open = false;
                depth -= 1;
            }
            Clause::Compare {
                connector,
                column,
                op,
                value,
            } => {
                let placeholder = binder.bind(value.clone());
                let body = format!("{column} {op} {placeholder}");
                push_clause(&mut out, *connector, &body, &mut after_open);
            }
            Clause::InList {
                connector,
                column,
                values,
                negated,
            } => {
                let body = if values.is_empty() {
                    always(*negated).to_string()
                } else {
                    let placeholders: Vec<String> =
                        values.iter().map(|v| binder.bind(v.clone())).collect();
                    let keyword = if *negated { "NOT IN" } else { "IN" };
                    format!("{column} {keyword} ({})", placeholders.join(","))
                };
                push_clause(&mut out, *connector, &body, &mut after_open);
            }
            Clause::Raw { connector, sql } => {
                push_clause(&mut out, *connector, sql, &mut after_open);
            }
        }
    }

    if depth != 0 {
        return Err(SqlError::GroupingImbalance(format!(
            "{depth} group(s) left open"
        )));
    }

    Ok(out)
}

/// `1=1` for a negated (always true) guard, `1=0` otherwise.
fn always(truthy: bool) -> &'static str {
    if truthy { "1=1" } else { "1=0" }
}

fn push_clause(out: &mut String, connector: Connector, body: &str, after_open: &mut bool) {
    if *after_open {
        push_part(out, body);
        *after_open = false;
    } else {
        push_part(out, &format!("{} {body}", connector.as_str()));
    }
}

fn push_part(out: &mut String, part: &str) {
    if !out.is_empty() && !out.ends_with('(') {
        out.push(' ');
    }
    out.push_str(part);
}

/// Predicate-building methods shared by [`QueryBuilder`](crate::QueryBuilder)
/// and [`WhereGroup`].
///
/// Implementors only expose their clause list; every method appends to it.
pub trait Conditions {
    /// The clause list predicates are appended to.
    fn clauses_mut(&mut self) -> &mut Vec<Clause>;

    /// Add `column op value` with an explicit connector.
    fn where_with(
        &mut self,
        connector: Connector,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.clauses_mut().push(Clause::Compare {
            connector,
            column: column.into(),
            op: op.into(),
            value: value.into(),
        });
        self
    }

    /// Add `AND column op value`.
    ///
    /// `op` is written into the SQL as-is and must not come from user input.
    fn where_(
        &mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.where_with(Connector::And, column, op, value)
    }

    /// Add `OR column op value`.
    fn or_where(
        &mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.where_with(Connector::Or, column, op, value)
    }

    /// Add `AND column = value`.
    fn where_eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_with(Connector::And, column, "=", value)
    }

    /// Add `OR column = value`.
    fn or_where_eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.where_with(Connector::Or, column, "=", value)
    }

    /// Add one equality per pair, joined with AND.
    fn where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (column, value) in pairs {
            self.where_with(Connector::And, column, "=", value);
        }
        self
    }

    /// Like [`where_map`](Conditions::where_map), but the first equality is
    /// connected with OR.
    fn or_where_map<I, K, V>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut connector = Connector::Or;
        for (column, value) in pairs {
            self.where_with(connector, column, "=", value);
            connector = Connector::And;
        }
        self
    }

    /// Add a parenthesized group with an explicit connector.
    ///
    /// The closure receives a handle on the same clause list; everything it
    /// adds lands between the group's open and close markers.
    fn group_with<F>(&mut self, connector: Connector, build: F) -> &mut Self
    where
        F: FnOnce(&mut WhereGroup<'_>),
    {
        let clauses = self.clauses_mut();
        clauses.push(Clause::Open { connector });
        let mut group = WhereGroup {
            clauses: &mut *clauses,
        };
        build(&mut group);
        clauses.push(Clause::Close);
        self
    }

    /// Add `AND ( ... )`.
    fn where_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut WhereGroup<'_>),
    {
        self.group_with(Connector::And, build)
    }

    /// Add `OR ( ... )`.
    fn or_where_group<F>(&mut self, build: F) -> &mut Self
    where
        F: FnOnce(&mut WhereGroup<'_>),
    {
        self.group_with(Connector::Or, build)
    }

    /// Add `column [NOT] IN (...)` with an explicit connector.
    ///
    /// An empty value set degrades to `1=0` (IN) or `1=1` (NOT IN) and binds
    /// nothing.
    fn in_with<I>(
        &mut self,
        connector: Connector,
        column: impl Into<String>,
        values: I,
        negated: bool,
    ) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.raw_with(connector, always(negated));
        }
        self.clauses_mut().push(Clause::InList {
            connector,
            column: column.into(),
            values,
            negated,
        });
        self
    }

    fn where_in<I>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.in_with(Connector::And, column, values, false)
    }

    fn or_where_in<I>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.in_with(Connector::Or, column, values, false)
    }

    fn where_not_in<I>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.in_with(Connector::And, column, values, true)
    }

    fn or_where_not_in<I>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.in_with(Connector::Or, column, values, true)
    }

    fn where_null(&mut self, column: impl Into<String>) -> &mut Self {
        let sql = format!("{} IS NULL", column.into());
        self.raw_with(Connector::And, sql)
    }

    fn or_where_null(&mut self, column: impl Into<String>) -> &mut Self {
        let sql = format!("{} IS NULL", column.into());
        self.raw_with(Connector::Or, sql)
    }

    fn where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        let sql = format!("{} IS NOT NULL", column.into());
        self.raw_with(Connector::And, sql)
    }

    fn or_where_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        let sql = format!("{} IS NOT NULL", column.into());
        self.raw_with(Connector::Or, sql)
    }

    /// Add `AND column LIKE :pN`; the pattern is bound, not inlined.
    fn where_like(&mut self, column: impl Into<String>, pattern: impl Into<Value>) -> &mut Self {
        self.where_with(Connector::And, column, "LIKE", pattern)
    }

    fn or_where_like(&mut self, column: impl Into<String>, pattern: impl Into<Value>) -> &mut Self {
        self.where_with(Connector::Or, column, "LIKE", pattern)
    }

    fn where_not_like(
        &mut self,
        column: impl Into<String>,
        pattern: impl Into<Value>,
    ) -> &mut Self {
        self.where_with(Connector::And, column, "NOT LIKE", pattern)
    }

    fn or_where_not_like(
        &mut self,
        column: impl Into<String>,
        pattern: impl Into<Value>,
    ) -> &mut Self {
        self.where_with(Connector::Or, column, "NOT LIKE", pattern)
    }

    /// Add a raw fragment with an explicit connector.
    fn raw_with(&mut self, connector: Connector, sql: impl Into<String>) -> &mut Self {
        self.clauses_mut().push(Clause::Raw {
            connector,
            sql: sql.into(),
        });
        self
    }

    /// Add a raw WHERE fragment.
    ///
    /// # Safety
    ///
    /// This directly concatenates SQL. The caller must ensure safety.
    fn where_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.raw_with(Connector::And, sql)
    }

    fn or_where_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.raw_with(Connector::Or, sql)
    }
}

/// Handle lent to a grouping closure.
///
/// It appends to the owning builder's clause list, so predicates added here
/// are rendered in place, inside the group's parentheses. Groups nest.
pub struct WhereGroup<'a> {
    clauses: &'a mut Vec<Clause>,
}

impl Conditions for WhereGroup<'_> {
    fn clauses_mut(&mut self) -> &mut Vec<Clause> {
        &mut *self.clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct List(Vec<Clause>);

    impl Conditions for List {
        fn clauses_mut(&mut self) -> &mut Vec<Clause> {
            &mut self.0
        }
    }

    fn render(list: &List) -> (String, Binder) {
        let mut binder = Binder::new();
        let sql = compile(&list.0, &mut binder).unwrap();
        (sql, binder)
    }

    #[test]
    fn never_starts_with_connector() {
        let mut list = List::default();
        list.or_where("a", "=", 1).where_("b", ">", 2);
        let (sql, _) = render(&list);
        assert_eq!(sql, "a = :p1 AND b > :p2");
    }

    #[test]
    fn first_clause_in_group_drops_connector() {
        let mut list = List::default();
        list.where_eq("a", 1)
            .where_group(|g| {
                g.where_eq("b", 2).or_where_eq("c", 3);
            })
            .or_where_group(|g| {
                g.or_where_eq("d", 4);
            });
        let (sql, binder) = render(&list);
        assert_eq!(sql, "a = :p1 AND (b = :p2 OR c = :p3) OR (d = :p4)");
        assert_eq!(binder.bindings().len(), 4);
    }

    #[test]
    fn nested_groups_keep_nesting() {
        let mut list = List::default();
        list.where_group(|g| {
            g.where_group(|inner| {
                inner.where_eq("a", 1).or_where_eq("b", 2);
            })
            .where_eq("c", 3);
        });
        let (sql, _) = render(&list);
        assert_eq!(sql, "((a = :p1 OR b = :p2) AND c = :p3)");
    }

    #[test]
    fn empty_group_renders_true() {
        let mut list = List::default();
        list.where_eq("a", 1).where_group(|_| {});
        let (sql, _) = render(&list);
        assert_eq!(sql, "a = :p1 AND (1=1)");
    }

    #[test]
    fn empty_in_lists_bind_nothing() {
        let mut list = List::default();
        list.where_in("id", Vec::<i64>::new())
            .where_not_in("id", Vec::<i64>::new());
        let (sql, binder) = render(&list);
        assert_eq!(sql, "1=0 AND 1=1");
        assert_eq!(binder.counter(), 0);
    }

    #[test]
    fn in_list_binds_each_value() {
        let mut list = List::default();
        list.where_in("id", [1, 2, 3]).or_where_not_in("role", ["x"]);
        let (sql, binder) = render(&list);
        assert_eq!(sql, "id IN (:p1,:p2,:p3) OR role NOT IN (:p4)");
        assert_eq!(binder.bindings().get("p4"), Some(&Value::from("x")));
    }

    #[test]
    fn raw_fragments_participate_in_groups() {
        let mut list = List::default();
        list.where_null("deleted_at").where_group(|g| {
            g.where_not_null("a").or_where_raw("b > 1");
        });
        let (sql, _) = render(&list);
        assert_eq!(sql, "deleted_at IS NULL AND (a IS NOT NULL OR b > 1)");
    }

    #[test]
    fn unbalanced_markers_are_rejected() {
        let mut binder = Binder::new();
        let open = [Clause::Open {
            connector: Connector::And,
        }];
        assert!(matches!(
            compile(&open, &mut binder),
            Err(SqlError::GroupingImbalance(_))
        ));
        assert!(matches!(
            compile(&[Clause::Close], &mut binder),
            Err(SqlError::GroupingImbalance(_))
        ));
    }
}
