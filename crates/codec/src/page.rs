use serde::{Deserialize, Serialize};

use crate::record::{Record, encode_records};

/// A 1-indexed page of fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// First page of the given size.
    pub fn first(page_size: usize) -> Self {
        Self::new(1, page_size)
    }

    /// Index of the first record on this page; `None` when the page cannot
    /// hold anything (page 0, size 0, or an offset past `usize::MAX`).
    pub fn offset(&self) -> Option<usize> {
        if self.page == 0 || self.page_size == 0 {
            return None;
        }
        (self.page - 1).checked_mul(self.page_size)
    }
}

/// One page of an ordered collection plus the collection's totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    /// Records in the whole collection.
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `records` to the requested page. Out-of-range pages are empty,
    /// never an error.
    pub fn collect<I>(records: I, request: PageRequest) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let window = request
            .offset()
            .map(|start| start..start.saturating_add(request.page_size));

        let mut items = Vec::new();
        let mut total = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            if window.as_ref().is_some_and(|w| w.contains(&index)) {
                items.push(record);
            }
            total += 1;
        }

        let total_pages = if request.page_size == 0 {
            0
        } else {
            total.div_ceil(request.page_size)
        };

        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

impl<T: Record> Page<T> {
    /// The page's records in the `|`-joined wire form.
    pub fn encode(&self) -> String {
        encode_records(&self.items)
    }
}
