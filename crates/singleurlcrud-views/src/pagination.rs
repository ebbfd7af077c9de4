//! Pagination for the list page.
//!
//! The `page` query parameter is parsed into a [`PageRequest`]: a page
//! number, `last`, or `all` (no pagination). [`PageWindow`] resolves it
//! against a row count alone, so the store only has to fetch the rows of
//! that page, which then become a [`Page`].
//!
//! # Examples
//!
//! ```
//! use singleurlcrud_views::pagination::{PageRequest, PageWindow};
//!
//! let window = PageWindow::resolve(45, 20, PageRequest::Number(3)).unwrap();
//! assert_eq!(window.num_pages, 3);
//!
//! let rows: Vec<usize> = (window.offset + 1..=window.offset + window.limit).collect();
//! let page = window.fill(rows);
//! assert_eq!(page.object_list().len(), 5);
//! assert!(!page.has_next());
//! assert_eq!(page.start_index(), 41);
//! ```

use std::str::FromStr;

use serde_json::json;
use thiserror::Error;

/// Errors produced when selecting a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The page number is beyond the last page.
    #[error("That page contains no results")]
    EmptyPage,
    /// The page value is neither a number nor a keyword.
    #[error("That page number is not an integer")]
    PageNotAnInteger,
    /// The page number is below 1.
    #[error("Invalid page: {0}")]
    InvalidPage(String),
}

/// The page a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// A 1-based page number.
    Number(usize),
    /// The last page.
    Last,
    /// Everything on one page.
    All,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl FromStr for PageRequest {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "last" => Ok(Self::Last),
            other => other
                .parse::<usize>()
                .map(Self::Number)
                .map_err(|_| PaginationError::PageNotAnInteger),
        }
    }
}

impl PageRequest {
    /// Parses an optional `page` parameter; absent means the first page.
    pub fn from_param(param: Option<&str>) -> Result<Self, PaginationError> {
        param.map_or(Ok(Self::default()), str::parse)
    }
}

/// Where one page sits in a list of `count` objects. An empty list still
/// has one (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub count: usize,
    /// Objects before this page.
    pub offset: usize,
    /// Objects on this page.
    pub limit: usize,
}

impl PageWindow {
    /// Resolves `request` against `count` objects split `per_page` at a
    /// time (a zero page size is treated as 1).
    pub fn resolve(
        count: usize,
        per_page: usize,
        request: PageRequest,
    ) -> Result<Self, PaginationError> {
        let per_page = per_page.max(1);
        let num_pages = count.div_ceil(per_page).max(1);
        let number = match request {
            PageRequest::All => {
                return Ok(Self {
                    number: 1,
                    num_pages: 1,
                    per_page: count.max(1),
                    count,
                    offset: 0,
                    limit: count,
                })
            }
            PageRequest::Last => num_pages,
            PageRequest::Number(0) => {
                return Err(PaginationError::InvalidPage(
                    "Page number must be >= 1".to_string(),
                ))
            }
            PageRequest::Number(n) if n > num_pages => return Err(PaginationError::EmptyPage),
            PageRequest::Number(n) => n,
        };
        let offset = (number - 1) * per_page;
        Ok(Self {
            number,
            num_pages,
            per_page,
            count,
            offset,
            limit: per_page.min(count - offset),
        })
    }

    /// Builds the page from the objects fetched for this window.
    pub fn fill<T>(self, object_list: Vec<T>) -> Page<T> {
        Page {
            object_list,
            number: self.number,
            num_pages: self.num_pages,
            per_page: self.per_page,
            count: self.count,
        }
    }
}

/// One page of objects.
#[derive(Debug, Clone)]
pub struct Page<T> {
    object_list: Vec<T>,
    number: usize,
    num_pages: usize,
    per_page: usize,
    count: usize,
}

impl<T> Page<T> {
    /// Returns the objects on this page.
    pub fn object_list(&self) -> &[T] {
        &self.object_list
    }

    /// Consumes the page, returning its objects.
    pub fn into_object_list(self) -> Vec<T> {
        self.object_list
    }

    /// Returns the 1-based page number.
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns the total number of pages.
    pub const fn num_pages(&self) -> usize {
        self.num_pages
    }

    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    /// The 1-based index of the first object on this page, 0 when empty.
    pub const fn start_index(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    /// The 1-based index of the last object on this page.
    pub const fn end_index(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            self.start_index() + self.object_list.len() - 1
        }
    }

    /// Template context for the pager. `url_for` maps a page number to its
    /// link.
    pub fn as_context(&self, url_for: impl Fn(usize) -> String) -> serde_json::Value {
        let links: Vec<serde_json::Value> = (1..=self.num_pages)
            .map(|n| json!({ "number": n, "url": url_for(n), "current": n == self.number }))
            .collect();
        json!({
            "number": self.number,
            "num_pages": self.num_pages,
            "count": self.count,
            "has_next": self.has_next(),
            "has_previous": self.has_previous(),
            "next_url": self.has_next().then(|| url_for(self.number + 1)),
            "previous_url": self.has_previous().then(|| url_for(self.number - 1)),
            "start_index": self.start_index(),
            "end_index": self.end_index(),
            "links": links,
        })
    }
}
