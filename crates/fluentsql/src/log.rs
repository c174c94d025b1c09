//! SQL logging through `tracing`.

use crate::config::BuilderConfig;
use tracing::Level;

pub(crate) const SQL_TARGET: &str = "fluentsql.sql";

/// Truncate a string to at most `max_bytes` bytes on a UTF-8 char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn truncate_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

/// Emit the SQL that is about to run, at the configured level.
pub(crate) fn log_sql(config: &BuilderConfig, kind: &str, sql: &str, param_count: usize) {
    /// Dispatch a tracing event at a runtime-determined level.
    macro_rules! emit_at_level {
        ($level:expr, $($field:tt)*) => {
            match $level {
                Level::ERROR => tracing::error!($($field)*),
                Level::WARN  => tracing::warn!($($field)*),
                Level::INFO  => tracing::info!($($field)*),
                Level::DEBUG => tracing::debug!($($field)*),
                Level::TRACE => tracing::trace!($($field)*),
            }
        };
    }

    let sql = truncate_sql(sql, config.max_sql_log_length);
    emit_at_level!(
        config.log_level,
        target: SQL_TARGET,
        kind,
        param_count,
        sql = %sql,
    );
}
