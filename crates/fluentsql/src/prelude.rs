//! Convenient imports for typical `fluentsql` usage.
//!
//! ```ignore
//! use fluentsql::prelude::*;
//! ```

pub use crate::{
    BuilderConfig, Conditions, Connection, Page, QueryBuilder, Row, SchemaCache, SqlError,
    SqlResult, Statement, Value, table, transactional,
};

#[cfg(feature = "postgres")]
pub use crate::PgConnection;
