//! Blocking PostgreSQL connection.
//!
//! [`PgConnection`] drives a `tokio_postgres::Client` from its own
//! current-thread runtime, so every call blocks until the server answers.
//! SQL rendered with `:name` placeholders is rewritten to Postgres' `$n`
//! form before it is prepared.

use std::collections::VecDeque;
use std::error::Error as StdError;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, Config, NoTls};

use crate::binder::PLACEHOLDER_PREFIX;
use crate::connection::{Connection, Row, Statement};
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// A blocking connection to PostgreSQL.
pub struct PgConnection {
    runtime: Runtime,
    client: Client,
    in_transaction: bool,
}

impl PgConnection {
    /// Connect using a URL or key/value connection string.
    pub fn connect(url: &str) -> SqlResult<Self> {
        let config: Config = url.parse()?;
        Self::connect_with(&config)
    }

    /// Connect using an explicit `tokio_postgres::Config` (no TLS).
    pub fn connect_with(config: &Config) -> SqlResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SqlError::Connection(e.to_string()))?;

        let (client, connection) = runtime.block_on(config.connect(NoTls))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection closed with error");
            }
        });

        Ok(Self {
            runtime,
            client,
            in_transaction: false,
        })
    }

    /// The underlying async client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Run one or more statements without parameters (DDL, session settings).
    pub fn batch_execute(&mut self, sql: &str) -> SqlResult<()> {
        self.batch(sql)
    }

    fn batch(&self, sql: &str) -> SqlResult<()> {
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }
}

impl Connection for PgConnection {
    type Statement<'c> = PgStatement<'c>;

    fn prepare(&mut self, sql: &str) -> SqlResult<PgStatement<'_>> {
        let (positional, names) = to_positional(sql);
        let statement = self.runtime.block_on(self.client.prepare(&positional))?;
        let params = vec![Value::Null; names.len()];
        Ok(PgStatement {
            conn: self,
            statement,
            names,
            params,
            rows: VecDeque::new(),
            row_count: 0,
        })
    }

    fn last_insert_id(&mut self) -> SqlResult<String> {
        let row = self
            .runtime
            .block_on(self.client.query_one("SELECT lastval()", &[]))?;
        let id: i64 = row.try_get(0)?;
        Ok(id.to_string())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn begin_transaction(&mut self) -> SqlResult<()> {
        if self.in_transaction {
            return Err(SqlError::Other("transaction already open".to_string()));
        }
        self.batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    // The server ends the transaction block even when COMMIT fails.
    fn commit(&mut self) -> SqlResult<()> {
        self.in_transaction = false;
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> SqlResult<()> {
        self.in_transaction = false;
        self.batch("ROLLBACK")
    }
}

/// A statement prepared on a [`PgConnection`].
pub struct PgStatement<'c> {
    conn: &'c mut PgConnection,
    statement: tokio_postgres::Statement,
    /// Placeholder names in `$n` order.
    names: Vec<String>,
    params: Vec<Value>,
    rows: VecDeque<Row>,
    row_count: u64,
}

impl Statement for PgStatement<'_> {
    fn bind_value(&mut self, name: &str, value: &Value) -> SqlResult<()> {
        let name = name.strip_prefix(PLACEHOLDER_PREFIX).unwrap_or(name);
        let index = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SqlError::Query(format!("unknown placeholder :{name}")))?;
        self.params[index] = value.clone();
        Ok(())
    }

    fn execute(&mut self) -> SqlResult<()> {
        let params: Vec<&(dyn ToSql + Sync)> = self
            .params
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();
        let runtime = &self.conn.runtime;
        let client = &self.conn.client;

        if self.statement.columns().is_empty() {
            self.row_count = runtime.block_on(client.execute(&self.statement, &params))?;
            self.rows.clear();
        } else {
            let rows = runtime.block_on(client.query(&self.statement, &params))?;
            self.row_count = rows.len() as u64;
            self.rows = rows.iter().map(decode_row).collect::<SqlResult<_>>()?;
        }
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

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                _ if is_textual(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch("a boolean", ty)),
            },
            Value::Int(n) => match *ty {
                Type::INT2 => i16::try_from(*n)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*n)?.to_sql(ty, out),
                Type::INT8 => n.to_sql(ty, out),
                Type::OID => u32::try_from(*n)?.to_sql(ty, out),
                Type::FLOAT4 => (*n as f32).to_sql(ty, out),
                Type::FLOAT8 => (*n as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*n).to_sql(ty, out),
                Type::BOOL => (*n != 0).to_sql(ty, out),
                _ if is_textual(ty) => n.to_string().to_sql(ty, out),
                _ => Err(mismatch("an integer", ty)),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ if is_textual(ty) => f.to_string().to_sql(ty, out),
                _ => Err(mismatch("a float", ty)),
            },
            Value::Text(s) => text_to_sql(s, ty, out),
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.as_slice().to_sql(ty, out),
                _ => Err(mismatch("bytes", ty)),
            },
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                _ if is_textual(ty) => j.to_string().to_sql(ty, out),
                _ => Err(mismatch("JSON", ty)),
            },
            Value::Timestamp(t) => match *ty {
                Type::TIMESTAMPTZ => t.to_sql(ty, out),
                Type::TIMESTAMP => t.naive_utc().to_sql(ty, out),
                Type::DATE => t.date_naive().to_sql(ty, out),
                _ if is_textual(ty) => t.to_rfc3339().to_sql(ty, out),
                _ => Err(mismatch("a timestamp", ty)),
            },
            Value::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                _ if is_textual(ty) => u.to_string().to_sql(ty, out),
                _ => Err(mismatch("a UUID", ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Parameters are sent in binary form, so text bound to a typed parameter is
/// parsed into that type first.
fn text_to_sql(
    s: &str,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
    let trimmed = s.trim();
    match *ty {
        Type::INT2 => trimmed.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => trimmed.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => trimmed.parse::<i64>()?.to_sql(ty, out),
        Type::OID => trimmed.parse::<u32>()?.to_sql(ty, out),
        Type::FLOAT4 => trimmed.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => trimmed.parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => trimmed.parse::<Decimal>()?.to_sql(ty, out),
        Type::BOOL => parse_bool(trimmed)?.to_sql(ty, out),
        Type::TIMESTAMP => parse_naive_datetime(trimmed)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_datetime(trimmed)?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => parse_time(trimmed)?.to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(trimmed)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        _ if is_textual(ty) => s.to_sql(ty, out),
        _ => Err(mismatch("text", ty)),
    }
}

/// Types whose binary form is the UTF-8 text itself.
fn is_textual(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty) || matches!(ty.kind(), Kind::Enum(_))
}

fn mismatch(what: &str, ty: &Type) -> Box<dyn StdError + Sync + Send> {
    format!("cannot bind {what} to a {ty} parameter").into()
}

fn parse_bool(s: &str) -> Result<bool, Box<dyn StdError + Sync + Send>> {
    match s.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("invalid boolean {s:?}").into()),
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-times with or without seconds; a bare date means midnight.
fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    for format in DATETIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
}

/// RFC 3339, `<date> <time><offset>`, or a naive value taken as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(t.with_timezone(&Utc));
    }
    parse_naive_datetime(s).map(|t| t.and_utc())
}

fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
}

fn decode_row(row: &tokio_postgres::Row) -> SqlResult<Row> {
    let mut out = Row::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, idx, column.type_())
            .map_err(|e| SqlError::decode(column.name(), e))?;
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<Value, String> {
    fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize) -> Result<Option<T>, String>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx).map_err(|e| e.to_string())
    }

    let value = match *ty {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, idx)?.map(Value::Text)
        }
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)?.map(Value::Timestamp),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(|t| Value::Timestamp(t.and_utc())),
        Type::UUID => get::<uuid::Uuid>(row, idx)?.map(Value::Uuid),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(|d| Value::Text(d.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(|t| Value::Text(t.to_string())),
        Type::NUMERIC => get::<Decimal>(row, idx)?.map(|d| Value::Text(d.to_string())),
        _ if matches!(ty.kind(), Kind::Enum(_)) => get::<String>(row, idx)?.map(Value::Text),
        _ => return Err(format!("unsupported column type {ty}")),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Rewrite `:name` placeholders to `$n`.
///
/// Names are numbered in order of first use; a repeated name reuses its
/// number. String literals, quoted identifiers and `::` casts are copied
/// unchanged. Returns the SQL and the names in `$n` order.
pub fn to_positional(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if chars.peek() == Some(&':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars
                .peek()
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
            {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let index = match names.iter().position(|existing| *existing == name) {
                    Some(i) => i,
                    None => {
                        names.push(name);
                        names.len() - 1
                    }
                };
                out.push_str(&format!("${}", index + 1));
            }
            _ => out.push(c),
        }
    }

    (out, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_in_order_of_first_use() {
        let (sql, names) = to_positional("SELECT * FROM t WHERE a = :p1 OR b = :p2 OR c = :p1");
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 OR b = $2 OR c = $1");
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn leaves_casts_and_literals_alone() {
        let (sql, names) =
            to_positional("SELECT ':p9', \"a:b\", x::text FROM t WHERE id = :p3::int8");
        assert_eq!(
            sql,
            "SELECT ':p9', \"a:b\", x::text FROM t WHERE id = $1::int8"
        );
        assert_eq!(names, vec!["p3"]);
    }

    fn encode(value: impl Into<Value>, ty: &Type) -> Vec<u8> {
        let mut buf = BytesMut::new();
        value.into().to_sql_checked(ty, &mut buf).unwrap();
        buf.to_vec()
    }

    fn encode_err(value: impl Into<Value>, ty: &Type) -> String {
        let mut buf = BytesMut::new();
        value.into().to_sql_checked(ty, &mut buf).err().expect("expected encoding error").to_string()
    }

    #[test]
    fn text_is_parsed_into_typed_parameters() {
        assert_eq!(encode("5", &Type::INT4), 5i32.to_be_bytes());
        assert_eq!(encode(" 7 ", &Type::INT8), 7i64.to_be_bytes());
        assert_eq!(encode("t", &Type::BOOL), [1]);
        assert_eq!(encode("1.5", &Type::FLOAT8), 1.5f64.to_be_bytes());

        let uuid = uuid::Uuid::new_v4();
        assert_eq!(encode(uuid.to_string(), &Type::UUID), uuid.as_bytes());
    }

    #[test]
    fn text_dates_and_times_use_binary_widths() {
        let midnight = encode("2020-01-01", &Type::TIMESTAMP);
        assert_eq!(midnight.len(), 8);
        assert_eq!(midnight, encode("2020-01-01 00:00:00", &Type::TIMESTAMP));
        assert_eq!(encode("2020-01-01T10:30", &Type::TIMESTAMP).len(), 8);

        let utc = encode("2020-01-01T00:00:00Z", &Type::TIMESTAMPTZ);
        assert_eq!(utc, encode("2020-01-01T02:00:00+02:00", &Type::TIMESTAMPTZ));
        assert_eq!(utc, midnight);

        // days since 2000-01-01
        assert_eq!(encode("2000-01-02", &Type::DATE), 1i32.to_be_bytes());
        assert_eq!(encode("00:00:01", &Type::TIME), 1_000_000i64.to_be_bytes());
    }

    #[test]
    fn text_numeric_matches_decimal_encoding() {
        let mut expected = BytesMut::new();
        "12.50"
            .parse::<Decimal>()
            .unwrap()
            .to_sql(&Type::NUMERIC, &mut expected)
            .unwrap();
        assert_eq!(encode("12.50", &Type::NUMERIC), expected.to_vec());
        assert_eq!(encode(3, &Type::NUMERIC), {
            let mut buf = BytesMut::new();
            Decimal::from(3).to_sql(&Type::NUMERIC, &mut buf).unwrap();
            buf.to_vec()
        });
    }

    #[test]
    fn text_parameters_stay_raw() {
        assert_eq!(encode("hello", &Type::TEXT), b"hello");
        assert_eq!(encode("2020-01-01", &Type::VARCHAR), b"2020-01-01");
        assert_eq!(encode(42, &Type::TEXT), b"42");
    }

    #[test]
    fn unparsable_or_unsupported_text_is_an_error() {
        assert!(encode_err("abc", &Type::INT4).contains("invalid digit"));
        assert!(!encode_err("yesterday", &Type::TIMESTAMP).is_empty());
        assert!(encode_err("maybe", &Type::BOOL).contains("invalid boolean"));
        assert_eq!(
            encode_err("(1,2)", &Type::POINT),
            "cannot bind text to a point parameter"
        );
        assert_eq!(
            encode_err(vec![1u8, 2], &Type::INT4),
            "cannot bind bytes to a int4 parameter"
        );
    }

    #[test]
    fn lone_colon_is_kept() {
        let (sql, names) = to_positional("SELECT '10:30' AS t, 1 : 2");
        assert_eq!(sql, "SELECT '10:30' AS t, 1 : 2");
        assert!(names.is_empty());
    }
}
