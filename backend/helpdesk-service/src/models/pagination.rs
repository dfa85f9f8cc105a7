use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Resolved page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    /// Apply defaults and bounds to raw query values.
    pub fn resolve(
        page: Option<i64>,
        per_page: Option<i64>,
        default_per_page: i64,
        max_per_page: i64,
    ) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        let per_page = per_page.unwrap_or(default_per_page);

        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".into()));
        }
        if !(1..=max_per_page).contains(&per_page) {
            return Err(AppError::Validation(format!(
                "per_page must be between 1 and {max_per_page}"
            )));
        }
        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        PageMeta::new(total, self.page, self.per_page)
    }
}

/// Pagination envelope flattened into list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            total,
            page,
            per_page,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_meta_arithmetic() {
        let meta = PageMeta::new(45, 2, 20);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let last = PageMeta::new(45, 3, 20);
        assert!(!last.has_next);

        let exact = PageMeta::new(40, 2, 20);
        assert_eq!(exact.pages, 2);
        assert!(!exact.has_next);
    }

    #[test]
    fn test_empty_result() {
        let meta = PageMeta::new(0, 1, 20);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_resolve_defaults_and_bounds() {
        let page = Page::resolve(None, None, 20, 100).unwrap();
        assert_eq!(page, Page { page: 1, per_page: 20 });
        assert_eq!(page.offset(), 0);

        let page = Page::resolve(Some(3), Some(50), 20, 100).unwrap();
        assert_eq!(page.offset(), 100);
        assert_eq!(page.limit(), 50);

        assert!(Page::resolve(Some(0), None, 20, 100).is_err());
        assert!(Page::resolve(None, Some(101), 20, 100).is_err());
        assert!(Page::resolve(None, Some(0), 20, 100).is_err());
        assert!(Page::resolve(None, Some(200), 50, 200).is_ok());
    }
}
