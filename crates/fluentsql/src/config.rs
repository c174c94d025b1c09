//! Builder configuration.

use tracing::Level;

/// Settings shared by a [`QueryBuilder`](crate::QueryBuilder) and its
/// terminal operations.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Page size used by `paginate_default()`.
    pub default_per_page: u64,
    /// Upper bound applied to the requested page size. `None` means no cap.
    pub max_per_page: Option<u64>,
    /// Tracing event level for executed SQL.
    pub log_level: Level,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_log_length: Option<usize>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: None,
            log_level: Level::DEBUG,
            max_sql_log_length: Some(200),
        }
    }
}

impl BuilderConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default page size (clamped to at least 1).
    pub fn default_per_page(mut self, per_page: u64) -> Self {
        self.default_per_page = per_page.max(1);
        self
    }

    /// Cap the page size accepted by `paginate()`.
    pub fn max_per_page(mut self, max: u64) -> Self {
        self.max_per_page = Some(max.max(1));
        self
    }

    /// Override the tracing event level.
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }

    /// Clamp a requested page size to `[1, max_per_page]`.
    pub(crate) fn clamp_per_page(&self, per_page: u64) -> u64 {
        let per_page = per_page.max(1);
        match self.max_per_page {
            Some(max) => per_page.min(max),
            None => per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BuilderConfig::default();
        assert_eq!(config.default_per_page, 20);
        assert_eq!(config.max_per_page, None);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.max_sql_log_length, Some(200));
    }

    #[test]
    fn clamp_respects_cap() {
        let config = BuilderConfig::new().max_per_page(50);
        assert_eq!(config.clamp_per_page(0), 1);
        assert_eq!(config.clamp_per_page(10), 10);
        assert_eq!(config.clamp_per_page(500), 50);
    }
}
