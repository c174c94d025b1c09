//! Statement renderers.
//!
//! Every render starts a fresh binding set; the placeholder counter keeps
//! counting across renders, so SQL from two renders never shares a name.

use super::{InsertPayload, QueryBuilder, StatementKind};
use crate::binder::Bindings;
use crate::error::{SqlError, SqlResult};
use crate::log::SQL_TARGET;
use crate::predicate;

impl QueryBuilder {
    /// Render the statement for the current kind.
    ///
    /// Bindings for the returned SQL are available from
    /// [`bindings()`](QueryBuilder::bindings) until the next render.
    pub fn to_sql(&mut self) -> SqlResult<String> {
        let table = match self.table.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => {
                return Err(SqlError::configuration(
                    "no table set; call table(...) first",
                ));
            }
        };
        self.binder.reset_bindings();

        match self.kind {
            StatementKind::Select => self.render_select(&table),
            StatementKind::Insert => self.render_insert(&table),
            StatementKind::Update => self.render_update(&table),
            StatementKind::Delete => self.render_delete(&table),
        }
    }

    /// Bindings of the most recent render, in placeholder order.
    pub fn bindings(&self) -> &Bindings {
        self.binder.bindings()
    }

    fn render_select(&mut self, table: &str) -> SqlResult<String> {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), table);
        if let Some(alias) = &self.alias {
            sql.push(' ');
            sql.push_str(alias);
        }

        for join in &self.joins {
            sql.push_str(&format!(
                " {} JOIN {} ON {} {} {}",
                join.kind.as_str(),
                join.table,
                join.left,
                join.op,
                join.right
            ));
        }

        sql.push_str(&self.where_sql(false)?);

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        let having = predicate::compile(&self.having, &mut self.binder)?;
        if !having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(sql)
    }

    fn render_insert(&mut self, table: &str) -> SqlResult<String> {
        match &self.insert {
            Some(InsertPayload::Row(row)) if !row.is_empty() => {
                let mut columns = Vec::with_capacity(row.len());
                let mut placeholders = Vec::with_capacity(row.len());
                for (column, value) in row {
                    columns.push(column.as_str());
                    placeholders.push(self.binder.bind(value.clone()));
                }
                Ok(format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(","),
                    placeholders.join(",")
                ))
            }
            Some(InsertPayload::Columns { columns, rows })
                if !columns.is_empty() && !rows.is_empty() =>
            {
                let groups: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let placeholders: Vec<String> =
                            row.iter().map(|v| self.binder.bind(v.clone())).collect();
                        format!("({})", placeholders.join(","))
                    })
                    .collect();
                Ok(format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    table,
                    columns.join(","),
                    groups.join(", ")
                ))
            }
            _ => Err(SqlError::data_missing("no insert data provided")),
        }
    }

    fn render_update(&mut self, table: &str) -> SqlResult<String> {
        if self.update.is_empty() {
            return Err(SqlError::data_missing("no update data provided"));
        }
        let sets: Vec<String> = self
            .update
            .iter()
            .map(|(column, value)| format!("{} = {}", column, self.binder.bind(value.clone())))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
        sql.push_str(&self.where_sql(true)?);
        Ok(sql)
    }

    fn render_delete(&mut self, table: &str) -> SqlResult<String> {
        let mut sql = format!("DELETE FROM {table}");
        sql.push_str(&self.where_sql(true)?);
        Ok(sql)
    }

    /// ` WHERE ...`, or the always-false guard for mutations without predicates.
    fn where_sql(&mut self, guard: bool) -> SqlResult<String> {
        let expr = predicate::compile(&self.wheres, &mut self.binder)?;
        if !expr.is_empty() {
            return Ok(format!(" WHERE {expr}"));
        }
        if guard {
            tracing::warn!(
                target: SQL_TARGET,
                kind = self.kind.as_str(),
                "no predicates on a mutating statement; rendering WHERE 1=0"
            );
            return Ok(" WHERE 1=0".to_string());
        }
        Ok(String::new())
    }
}
