use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

pub const MAX_PER_PAGE: u32 = 100;

/// One-based page selection.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageRequest {
    page: NonZeroU32,
    per_page: NonZeroU32,
}

impl PageRequest {
    /// Out-of-range values are clamped: page 0 becomes 1 and `per_page` is kept in
    /// `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: NonZeroU32::new(page).unwrap_or(NonZeroU32::MIN),
            per_page: NonZeroU32::new(per_page.min(MAX_PER_PAGE)).unwrap_or(NonZeroU32::MIN),
        }
    }

    #[must_use]
    pub fn page(self) -> u32 {
        self.page.get()
    }

    #[must_use]
    pub fn per_page(self) -> u32 {
        self.per_page.get()
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page.get() - 1) * u64::from(self.per_page.get())
    }

    #[must_use]
    pub fn limit(self) -> u64 {
        u64::from(self.per_page.get())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page(),
            per_page: request.per_page(),
            total,
        }
    }

    #[must_use]
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page.max(1)))
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.pages()
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
