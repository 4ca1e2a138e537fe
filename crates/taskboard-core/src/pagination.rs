//! Page and sort parameters for list operations

use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

/// Hard cap on page size
pub const MAX_LIMIT: u64 = 100;

/// Sort key as requested by the client, e.g. `-createdAt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    /// Parse `-?field`, accepting only fields listed in `sortable`
    pub fn parse(raw: &str, sortable: &[&str]) -> ServiceResult<Self> {
        let (descending, field) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ServiceError::invalid("sort", "Invalid sort parameter"));
        }

        if !sortable.contains(&field) {
            return Err(ServiceError::invalid(
                "sort",
                format!("Cannot sort by '{}'", field),
            ));
        }

        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }

    /// Reverse chronological
    pub fn newest_first() -> Self {
        Self {
            field: "createdAt".to_string(),
            descending: true,
        }
    }
}

/// Validated 1-based page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub sort: SortSpec,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page,
            limit,
            sort: SortSpec::newest_first(),
        }
    }

    /// Build from raw query-string values
    ///
    /// Missing values fall back to page 1, `default_limit` and `-createdAt`.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        sort: Option<&str>,
        default_limit: u64,
        sortable: &[&str],
    ) -> ServiceResult<Self> {
        let page = match page {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ServiceError::invalid("page", "Page must be a positive integer"))?,
            None => 1,
        };

        let limit = match limit {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|l| (1..=MAX_LIMIT).contains(l))
                .ok_or_else(|| {
                    ServiceError::invalid(
                        "limit",
                        format!("Limit must be between 1 and {}", MAX_LIMIT),
                    )
                })?,
            None => default_limit,
        };

        let sort = match sort {
            Some(raw) if !raw.is_empty() => SortSpec::parse(raw, sortable)?,
            _ => SortSpec::newest_first(),
        };

        let request = Self { page, limit, sort };
        request.index()?;
        Ok(request)
    }

    /// Zero-based page index for the paginator
    ///
    /// Fails when the row offset `(page - 1) * limit` does not fit in an `i64`.
    pub fn index(&self) -> ServiceResult<u64> {
        let index = self.page.saturating_sub(1);
        match index.checked_mul(self.limit) {
            Some(offset) if offset <= i64::MAX as u64 => Ok(index),
            _ => Err(ServiceError::invalid("page", "Page is out of range")),
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn empty(request: &PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: request.page,
            limit: request.limit,
        }
    }

    pub fn pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[&str] = &["createdAt", "name"];

    #[test]
    fn test_defaults() {
        let request = PageRequest::parse(None, None, None, 10, SORTABLE).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        assert_eq!(request.sort, SortSpec::newest_first());
        assert_eq!(request.index().unwrap(), 0);
    }

    #[test]
    fn test_explicit_values() {
        let request = PageRequest::parse(Some("3"), Some("25"), Some("name"), 10, SORTABLE).unwrap();
        assert_eq!(request.page, 3);
        assert_eq!(request.limit, 25);
        assert_eq!(request.sort.field, "name");
        assert!(!request.sort.descending);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(PageRequest::parse(Some("0"), None, None, 10, SORTABLE).is_err());
        assert!(PageRequest::parse(Some("abc"), None, None, 10, SORTABLE).is_err());
        assert!(PageRequest::parse(None, Some("0"), None, 10, SORTABLE).is_err());
        assert!(PageRequest::parse(None, Some("101"), None, 10, SORTABLE).is_err());
    }

    #[test]
    fn test_rejects_page_whose_offset_overflows() {
        let huge = u64::MAX.to_string();
        assert!(matches!(
            PageRequest::parse(Some(&huge), Some("10"), None, 10, SORTABLE),
            Err(ServiceError::Validation(_))
        ));

        let last = (i64::MAX as u64 / 10 + 1).to_string();
        assert!(PageRequest::parse(Some(&last), Some("10"), None, 10, SORTABLE).is_ok());

        assert!(PageRequest::new(u64::MAX, 100).index().is_err());
        assert_eq!(PageRequest::new(3, 25).index().unwrap(), 2);
    }

    #[test]
    fn test_sort_must_be_word_and_known() {
        assert!(SortSpec::parse("-createdAt", SORTABLE).unwrap().descending);
        assert!(SortSpec::parse("created-at", SORTABLE).is_err());
        assert!(SortSpec::parse("-", SORTABLE).is_err());
        assert!(SortSpec::parse("password", SORTABLE).is_err());
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.pages(), 3);
        assert_eq!(page.map(|v| v as u32).total, 21);
    }
}
