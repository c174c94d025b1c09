#![allow(dead_code)]

use std::collections::VecDeque;

use fluentsql::{Connection, Row, SqlError, SqlResult, Statement, Value};

/// One statement the connection executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub bindings: Vec<(String, Value)>,
}

/// In-memory `Connection` that records executed SQL and replays queued
/// result sets in order.
#[derive(Debug)]
pub struct MemoryConnection {
    pub executed: Vec<Executed>,
    pub tx_log: Vec<&'static str>,
    pub affected: u64,
    pub last_id: String,
    results: VecDeque<Vec<Row>>,
    in_tx: bool,
    fail_on: Option<String>,
    fail_commit: bool,
    fail_rollback: bool,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self {
            executed: Vec::new(),
            tx_log: Vec::new(),
            affected: 0,
            last_id: "0".to_string(),
            results: VecDeque::new(),
            in_tx: false,
            fail_on: None,
            fail_commit: false,
            fail_rollback: false,
        }
    }
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next executed statement.
    pub fn push_rows(&mut self, rows: Vec<Row>) -> &mut Self {
        self.results.push_back(rows);
        self
    }

    /// Queue a single-row `cnt` result.
    pub fn push_count(&mut self, total: i64) -> &mut Self {
        self.push_rows(vec![Row::from_pairs([("cnt", total)])])
    }

    /// Fail any statement whose SQL contains `needle`.
    pub fn fail_on(&mut self, needle: &str) -> &mut Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn fail_commit(&mut self) -> &mut Self {
        self.fail_commit = true;
        self
    }

    pub fn fail_rollback(&mut self) -> &mut Self {
        self.fail_rollback = true;
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|e| e.sql.as_str()).collect()
    }

    pub fn last(&self) -> &Executed {
        self.executed.last().expect("no statement executed")
    }
}

pub struct MemoryStatement<'c> {
    conn: &'c mut MemoryConnection,
    sql: String,
    bindings: Vec<(String, Value)>,
    rows: VecDeque<Row>,
    row_count: u64,
}

impl Statement for MemoryStatement<'_> {
    fn bind_value(&mut self, name: &str, value: &Value) -> SqlResult<()> {
        self.bindings.push((name.to_string(), value.clone()));
        Ok(())
    }

    fn execute(&mut self) -> SqlResult<()> {
        if let Some(needle) = &self.conn.fail_on {
            if self.sql.contains(needle.as_str()) {
                return Err(SqlError::Query(format!("forced failure on: {}", self.sql)));
            }
        }
        self.conn.executed.push(Executed {
            sql: self.sql.clone(),
            bindings: self.bindings.clone(),
        });
        let rows = self.conn.results.pop_front().unwrap_or_default();
        self.row_count = if rows.is_empty() {
            self.conn.affected
        } else {
            rows.len() as u64
        };
        self.rows = rows.into();
        Ok(())
    }

    fn fetch_all(&mut self) -> SqlResult<Vec<Row>> {
        Ok(self.rows.drain(..).collect())
    }

    fn fetch(&mut self) -> SqlResult<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }
}

impl Connection for MemoryConnection {
    type Statement<'c> = MemoryStatement<'c>;

    fn prepare(&mut self, sql: &str) -> SqlResult<MemoryStatement<'_>> {
        Ok(MemoryStatement {
            sql: sql.to_string(),
            conn: self,
            bindings: Vec::new(),
            rows: VecDeque::new(),
            row_count: 0,
        })
    }

    fn last_insert_id(&mut self) -> SqlResult<String> {
        Ok(self.last_id.clone())
    }

    fn in_transaction(&self) -> bool {
        self.in_tx
    }

    fn begin_transaction(&mut self) -> SqlResult<()> {
        if self.in_tx {
            return Err(SqlError::Other("already in transaction".to_string()));
        }
        self.in_tx = true;
        self.tx_log.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> SqlResult<()> {
        self.in_tx = false;
        if self.fail_commit {
            self.tx_log.push("commit-failed");
            return Err(SqlError::Query("deferred constraint violated".to_string()));
        }
        self.tx_log.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> SqlResult<()> {
        self.in_tx = false;
        if self.fail_rollback {
            return Err(SqlError::Connection("rollback lost".to_string()));
        }
        self.tx_log.push("rollback");
        Ok(())
    }
}

pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}
