//! # fluentsql
//!
//! A fluent, parameter-safe SQL query builder.
//!
//! ## Features
//!
//! - **Fluent**: chain `&mut self` calls, render only at the end
//! - **Always bound**: values become `:p1`, `:p2`, ... placeholders, never SQL text
//! - **Grouped predicates**: nested `( ... )` groups through a scoped handle
//! - **Three insert shapes**: single row, declared columns + `values()`, rows matched by name
//! - **Safe defaults**: UPDATE/DELETE without predicates render `WHERE 1=0`
//! - **Pagination**: COUNT derived from the query without disturbing the builder
//! - **Blocking Postgres adapter**: `PgConnection` (feature `postgres`, on by default)
//!
//! ## Example
//!
//! ```ignore
//! use fluentsql::prelude::*;
//!
//! let mut conn = PgConnection::connect("postgres://localhost/app")?;
//!
//! // SELECT
//! let adults = table("users")
//!     .where_("age", ">", 18)
//!     .or_where_group(|g| {
//!         g.where_eq("vip", true).where_not_null("verified_at");
//!     })
//!     .order_by_desc("created_at")
//!     .get(&mut conn)?;
//!
//! // INSERT, multi-row
//! let mut qb = table("tags");
//! qb.insert_columns(&["name", "slug"]);
//! qb.values(["Rust", "rust"])?.values(["SQL", "sql"])?;
//! qb.execute(&mut conn)?;
//!
//! // UPDATE
//! table("users")
//!     .update([("status", "inactive")])
//!     .where_eq("id", 42)
//!     .execute(&mut conn)?;
//!
//! // Pagination
//! let page = table("posts").where_eq("published", true).paginate(&mut conn, 2, 20)?;
//! ```

pub mod binder;
pub mod builder;
pub mod config;
pub mod connection;
pub mod error;
pub mod predicate;
pub mod prelude;
pub mod schema;
pub mod transaction;
pub mod value;

mod log;

#[cfg(feature = "postgres")]
pub mod pg;

pub use binder::{Binder, Bindings};
pub use builder::{InsertPayload, JoinKind, Page, QueryBuilder, StatementKind, table};
pub use config::BuilderConfig;
pub use connection::{Connection, Row, Statement};
pub use error::{SqlError, SqlResult};
pub use predicate::{Clause, Conditions, Connector, WhereGroup};
pub use schema::SchemaCache;
pub use transaction::transactional;
pub use value::Value;

#[cfg(feature = "postgres")]
pub use pg::{PgConnection, PgStatement};
