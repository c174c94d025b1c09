//! Pagination.

use super::QueryBuilder;
use crate::connection::{Connection, Row};
use crate::error::SqlResult;
use serde::Serialize;

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T = Row> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub page_count: u64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the total row count.
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let page_count = total.div_ceil(per_page.max(1));
        Self {
            items,
            total,
            page,
            per_page,
            page_count,
            has_prev: page > 1,
            has_next: page < page_count,
        }
    }

    /// Convert the items, keeping the page window.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            page_count: self.page_count,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}

impl QueryBuilder {
    /// Fetch page `page` (1-based) with `per_page` rows.
    ///
    /// `page` and `per_page` are clamped to at least 1, and `per_page` to the
    /// configured maximum. The total comes from a derived count query; the
    /// item query then runs with the page's limit and offset. Bindings,
    /// counter, columns, ordering, limit and offset are restored afterwards,
    /// also on error.
    pub fn paginate<C: Connection>(
        &mut self,
        conn: &mut C,
        page: u64,
        per_page: u64,
    ) -> SqlResult<Page> {
        let page = page.max(1);
        let per_page = self.config.clamp_per_page(per_page);

        let saved = self.snapshot();
        let result = self.fetch_page(conn, page, per_page);
        self.restore(saved);
        let page = result?;

        tracing::trace!(
            total = page.total,
            page = page.page,
            per_page = page.per_page,
            page_count = page.page_count,
            "paginated"
        );
        Ok(page)
    }

    fn fetch_page<C: Connection>(
        &mut self,
        conn: &mut C,
        page: u64,
        per_page: u64,
    ) -> SqlResult<Page> {
        let total = self.derived_count(conn)?;

        self.limit = Some(per_page);
        self.offset = Some((page - 1).saturating_mul(per_page));
        let items = self.get(conn)?;

        Ok(Page::new(items, total, page, per_page))
    }

    /// [`paginate`](QueryBuilder::paginate) with the configured default page size.
    pub fn paginate_default<C: Connection>(&mut self, conn: &mut C, page: u64) -> SqlResult<Page> {
        let per_page = self.config.default_per_page;
        self.paginate(conn, page, per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window() {
        let page = Page::new(vec![1, 2], 21, 2, 10);
        assert_eq!(page.page_count, 3);
        assert!(page.has_prev);
        assert!(page.has_next);

        let last = Page::new(Vec::<i32>::new(), 21, 3, 10);
        assert!(!last.has_next);

        let empty = Page::new(Vec::<i32>::new(), 0, 1, 10);
        assert_eq!(empty.page_count, 0);
        assert!(!empty.has_prev);
        assert!(!empty.has_next);
    }

    #[test]
    fn map_keeps_window() {
        let page = Page::new(vec![1, 2], 2, 1, 5).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 2);
    }
}
