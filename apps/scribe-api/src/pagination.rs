use serde::Serialize;
use utoipa::ToSchema;

/// Fixed page size for every listing.
pub const PAGE_SIZE: i64 = 10;

/// Pagination metadata returned alongside a page of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageMeta {
    pub number: i64,
    pub total_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// One page of items plus its metadata.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// Resolve a requested page number against a total item count.
///
/// Returns the metadata for the resolved page and the row offset to fetch.
/// A missing or out-of-range request clamps to the nearest valid page, so a
/// page number past the end yields the last page rather than an error.
pub fn paginate(count: i64, requested: Option<i64>) -> (PageMeta, i64) {
    let total_pages = if count <= 0 {
        1
    } else {
        (count + PAGE_SIZE - 1) / PAGE_SIZE
    };
    let number = requested.unwrap_or(1).clamp(1, total_pages);
    let offset = (number - 1) * PAGE_SIZE;

    let meta = PageMeta {
        number,
        total_pages,
        count: count.max(0),
        has_next: number < total_pages,
        has_previous: number > 1,
    };
    (meta, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_is_a_valid_first_page() {
        let (meta, offset) = paginate(0, None);
        assert_eq!(meta.number, 1);
        assert_eq!(meta.total_pages, 1);
        assert_eq!(meta.count, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_previous);
        assert_eq!(offset, 0);
    }

    #[test]
    fn middle_page_has_both_neighbours() {
        let (meta, offset) = paginate(25, Some(2));
        assert_eq!(meta.number, 2);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_previous);
        assert_eq!(offset, 10);
    }

    #[test]
    fn out_of_range_request_clamps_to_last_page() {
        let (meta, offset) = paginate(25, Some(99));
        assert_eq!(meta.number, 3);
        assert_eq!(offset, 20);
        assert!(!meta.has_next);
    }

    #[test]
    fn zero_and_negative_requests_clamp_to_first_page() {
        assert_eq!(paginate(25, Some(0)).0.number, 1);
        assert_eq!(paginate(25, Some(-4)).0.number, 1);
    }

    #[test]
    fn exact_multiple_of_page_size() {
        let (meta, _) = paginate(20, Some(2));
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
    }
}
