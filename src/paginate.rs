//! Fixed-size pages over an ordered result list.
//!
//! Pages are 1-indexed. An empty list has zero pages, and both navigation
//! directions are disabled for it.

use serde::Serialize;

/// Number of pages needed for `total` items.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// The slice of `items` shown on `page`.
///
/// Empty when `page` is 0 or past the last page.
pub fn window<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }

    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Which navigation buttons are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorState {
    pub can_go_prev: bool,
    pub can_go_next: bool,
}

/// Navigation availability for `page` out of `pages`.
pub fn cursor_state(page: usize, pages: usize) -> CursorState {
    if pages == 0 {
        return CursorState {
            can_go_prev: false,
            can_go_next: false,
        };
    }

    CursorState {
        can_go_prev: page > 1,
        can_go_next: page < pages,
    }
}

/// Per-session page position.
///
/// Only the page number and page count are stored; button availability is
/// derived from them on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
    pages: usize,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PageCursor {
    /// A cursor on the first page.
    pub fn new(pages: usize) -> Self {
        Self { page: 1, pages }
    }

    /// A cursor on `page`, for stateless single-page queries.
    pub fn at(page: usize, pages: usize) -> Self {
        Self { page, pages }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn state(&self) -> CursorState {
        cursor_state(self.page, self.pages)
    }

    /// Back to page 1 with a new page count.
    pub fn reset(&mut self, pages: usize) {
        *self = Self::new(pages);
    }

    /// Move forward one page. Returns false at the last page.
    pub fn next(&mut self) -> bool {
        if !self.state().can_go_next {
            return false;
        }
        self.page += 1;
        true
    }

    /// Move back one page. Returns false at the first page.
    pub fn prev(&mut self) -> bool {
        if !self.state().can_go_prev {
            return false;
        }
        self.page -= 1;
        true
    }

    /// "page/pages", or "0/0" when there is nothing to show.
    pub fn indicator(&self) -> String {
        if self.pages == 0 {
            "0/0".to_string()
        } else {
            format!("{}/{}", self.page, self.pages)
        }
    }
}
