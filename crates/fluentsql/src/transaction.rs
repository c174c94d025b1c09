//! Transaction helper.
//!
//! # Example
//!
//! ```ignore
//! use fluentsql::prelude::*;
//!
//! # fn demo<C: Connection>(conn: &mut C) -> SqlResult<()> {
//! fluentsql::transactional(conn, |conn| {
//!     table("accounts")
//!         .update([("balance", 0)])
//!         .where_eq("id", 1)
//!         .execute(conn)?;
//!     table("audit").insert([("action", "reset")]).execute(conn)?;
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

use crate::connection::Connection;
use crate::error::SqlError;

/// Runs `f` inside a transaction on `conn`.
///
/// - Begins a transaction unless one is already open.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`, or when the commit itself fails, and returns
///   that error; a failed rollback is logged, not returned.
///
/// When `conn` is already inside a transaction, `f` runs directly and the
/// outer transaction decides the outcome.
pub fn transactional<C, T, E, F>(conn: &mut C, f: F) -> Result<T, E>
where
    C: Connection,
    E: From<SqlError> + std::fmt::Display,
    F: FnOnce(&mut C) -> Result<T, E>,
{
    if conn.in_transaction() {
        return f(conn);
    }

    conn.begin_transaction()?;
    tracing::debug!("transaction started");

    let outcome = f(conn).and_then(|value| match conn.commit() {
        Ok(()) => {
            tracing::debug!("transaction committed");
            Ok(value)
        }
        Err(commit_err) => Err(E::from(commit_err)),
    });

    if let Err(error) = &outcome {
        rollback_after(conn, error);
    }
    outcome
}

fn rollback_after<C: Connection>(conn: &mut C, error: &dyn std::fmt::Display) {
    match conn.rollback() {
        Ok(()) => tracing::debug!(error = %error, "transaction rolled back"),
        Err(rollback_err) => tracing::warn!(
            error = %error,
            rollback_error = %rollback_err,
            "rollback failed"
        ),
    }
}
