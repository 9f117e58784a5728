//! One-based pagination for list views.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PER_PAGE: usize = 25;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PageRequest {
    /// One-based page number.
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PageRequest {
    #[must_use]
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> usize {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Slice `items` for the requested page; pages past the end are empty.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let page = request.page();
    let per_page = request.per_page();
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let skip = (page - 1).saturating_mul(per_page);
    Page {
        items: items.into_iter().skip(skip).take(per_page).collect(),
        page,
        per_page,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: usize, per_page: usize) -> PageRequest {
        PageRequest {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    #[test]
    fn slices_middle_page() {
        let page = paginate((1..=10).collect(), request(2, 3));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 10);
        assert_eq!(page.total_pages, 4);
    }

    #[test]
    fn last_page_is_partial() {
        let page = paginate((1..=10).collect(), request(4, 3));
        assert_eq!(page.items, vec![10]);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let page = paginate((1..=10).collect::<Vec<i32>>(), request(9, 3));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 10);
    }

    #[test]
    fn defaults_and_clamping() {
        let defaults = PageRequest::default();
        assert_eq!(defaults.page(), 1);
        assert_eq!(defaults.per_page(), DEFAULT_PER_PAGE);

        let extreme = request(0, 10_000);
        assert_eq!(extreme.page(), 1);
        assert_eq!(extreme.per_page(), MAX_PER_PAGE);
    }
}
