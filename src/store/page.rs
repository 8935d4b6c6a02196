//! Pagination

use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Caps the size to `max` and lifts a zero size to 1.
    pub fn clamp_size(self, max: usize) -> Self {
        Self {
            index: self.index,
            size: self.size.clamp(1, max.max(1)),
        }
    }
}

/// One page of results plus totals over the whole result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub page_size: usize,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Slices `all` according to `request`; `None` returns everything.
    pub fn slice(all: Vec<T>, request: Option<PageRequest>) -> Self {
        let total = all.len();
        let Some(request) = request else {
            return Self {
                page_size: total,
                items: all,
                page_index: 0,
                total_elements: total as u64,
                total_pages: if total == 0 { 0 } else { 1 },
            };
        };

        let size = request.size.max(1);
        let start = request.index.saturating_mul(size).min(total);
        let end = start.saturating_add(size).min(total);
        let items = all.into_iter().skip(start).take(end - start).collect();
        Self {
            items,
            page_index: request.index,
            page_size: size,
            total_elements: total as u64,
            total_pages: total.div_ceil(size) as u64,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        })
    }
}
