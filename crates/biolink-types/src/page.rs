//! Offset pagination shared by every listing query.

use serde::Serialize;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a caller may request. Bigger requests are clamped.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Builds a page request, clamping out-of-range values.
    ///
    /// `page` defaults to 1 and is raised to at least 1. `page_size` defaults
    /// to [`DEFAULT_PAGE_SIZE`] and is clamped into `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The 1-based page number.
    pub fn page(&self) -> i64 {
        self.page
    }

    /// Number of rows per page.
    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// The rows on this page.
    pub items: Vec<T>,
    /// Number of rows matching the filter across all pages.
    pub total: i64,
    /// The 1-based page number.
    pub page: i64,
    /// Requested rows per page.
    pub page_size: i64,
}

impl<T> Page<T> {
    /// Assembles a page from its rows and the overall match count.
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    /// Converts every row, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Turns a free-text search into a SQL `LIKE` pattern.
///
/// Returns `None` when the search is absent or blank, meaning "match every
/// row". Otherwise the trimmed term is wrapped in `%` with `%`, `_` and `\`
/// escaped; callers must use `ESCAPE '\'`.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}
