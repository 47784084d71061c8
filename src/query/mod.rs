//! Specification engine: composable filter + sort + paging + load criteria.
//!
//! A criteria value is short-lived and storage-agnostic. The invariant that
//! matters: toggling paging never changes the filter predicate, so a count or
//! sum computed without paging reflects exactly the same predicate as the
//! paged listing.

pub mod order;
pub mod product;

use serde::Serialize;

use crate::repository::Aggregate;

pub use order::{OrderFilter, OrderProjection, OrderQuery, OrderSort};
pub use product::{ProductFilter, ProductProjection, ProductQuery, ProductSort};

/// Caller scope decided by the surrounding authorization layer. Ownership
/// scoping is predicate composition, never a separate query path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Vendor(String),
}

impl Scope {
    pub fn vendor_id(&self) -> Option<&str> {
        match self {
            Self::Admin => None,
            Self::Vendor(id) => Some(id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sort<K> {
    pub key: K,
    pub dir: SortDir,
}

/// Page bounds, clamped the same way for every surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    index: u32,
    size: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Page {
    pub fn new(index: u32, size: u32) -> Self {
        Self {
            index: index.max(1),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.index - 1) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Eager-load directives for related data the response shape needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Load {
    /// Hydrate order line items. Paged listings skip them; single-entity
    /// lookups ask for them.
    pub line_items: bool,
}

/// Composable description of one query: filter predicate, sort, page bounds
/// and load directives.
pub struct Criteria<A: Aggregate> {
    pub filter: A::Filter,
    pub sort: Option<Sort<A::Sort>>,
    /// `None` disables paging; used when only a count or sum is required.
    pub page: Option<Page>,
    pub load: Load,
}

impl<A: Aggregate> Criteria<A> {
    pub fn new(filter: A::Filter) -> Self {
        Self {
            filter,
            sort: None,
            page: None,
            load: Load::default(),
        }
    }

    pub fn sorted(mut self, key: A::Sort, dir: SortDir) -> Self {
        self.sort = Some(Sort { key, dir });
        self
    }

    pub fn paged(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn loading(mut self, load: Load) -> Self {
        self.load = load;
        self
    }

    /// Equivalent criteria with the identical filter predicate and no page
    /// bounds. Counts and sums go through this.
    pub fn without_paging(mut self) -> Self {
        self.page = None;
        self
    }
}

// Manual impls: derives would demand `A: Clone + PartialEq` even though only
// the associated types appear in the fields.
impl<A: Aggregate> Clone for Criteria<A> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sort: self.sort,
            page: self.page,
            load: self.load,
        }
    }
}

impl<A: Aggregate> PartialEq for Criteria<A> {
    fn eq(&self, other: &Self) -> bool {
        self.filter == other.filter
            && self.sort == other.sort
            && self.page == other.page
            && self.load == other.load
    }
}

impl<A: Aggregate> std::fmt::Debug for Criteria<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Criteria")
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("page", &self.page)
            .field("load", &self.load)
            .finish()
    }
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Paged<T> {
    pub fn new(data: Vec<T>, total: u64, page: Option<Page>) -> Self {
        let page = page.unwrap_or_default();
        Self {
            data,
            total,
            page: page.index(),
            page_size: page.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;

    #[test]
    fn page_bounds_are_clamped() {
        let p = Page::new(0, 1000);
        assert_eq!(p.index(), 1);
        assert_eq!(p.size(), MAX_PAGE_SIZE);
        assert_eq!(Page::new(3, 10).offset(), 20);
    }

    #[test]
    fn disabling_paging_preserves_the_filter() {
        let params = ProductQuery {
            search: Some("board".into()),
            ..Default::default()
        };
        let paged = product::list_criteria(&params, &Scope::Vendor("v1".into()));
        let unpaged = paged.clone().without_paging();
        assert_eq!(paged.filter, unpaged.filter);
        assert!(paged.page.is_some());
        assert!(unpaged.page.is_none());
    }

    #[test]
    fn scope_is_an_extra_predicate_term() {
        let params = ProductQuery::default();
        let admin = product::list_criteria(&params, &Scope::Admin);
        let vendor = product::list_criteria(&params, &Scope::Vendor("v1".into()));
        assert_eq!(admin.filter.vendor_id, None);
        assert_eq!(vendor.filter.vendor_id.as_deref(), Some("v1"));
    }

    #[test]
    fn criteria_equality_is_structural() {
        let a = Criteria::<Product>::new(ProductFilter::default()).paged(Page::default());
        let b = Criteria::<Product>::new(ProductFilter::default()).paged(Page::default());
        assert_eq!(a, b);
        assert_ne!(a, b.clone().without_paging());
    }
}
