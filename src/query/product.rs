//! Product criteria: filters, sort keys and the builders both read surfaces
//! share. The vendor surface differs from the admin one only by the ownership
//! predicate the scope injects.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Product, ProductId, ProductStatus};
use crate::repository::Aggregate;

use super::{Criteria, Page, Scope, SortDir, DEFAULT_PAGE_SIZE};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub id: Option<ProductId>,
    pub status: Option<ProductStatus>,
    /// Ownership scoping predicate; set from [`Scope`], never by the caller.
    pub vendor_id: Option<String>,
    pub brands: Vec<String>,
    pub types: Vec<String>,
    /// Case-insensitive substring match across name, brand and type.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductSort {
    Name,
    Price,
}

/// Numeric projections a store can aggregate without materializing rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductProjection {
    /// price * quantity_in_stock
    StockValue,
}

/// Caller-supplied list parameters, straight off the query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
    /// Comma-separated brand names.
    pub brands: Option<String>,
    /// Comma-separated product types.
    pub types: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// "priceAsc" | "priceDesc" | anything else sorts by name.
    pub sort: Option<String>,
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

fn split_csv(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_sort(raw: &Option<String>) -> (ProductSort, SortDir) {
    match raw.as_deref() {
        Some("priceAsc") => (ProductSort::Price, SortDir::Asc),
        Some("priceDesc") => (ProductSort::Price, SortDir::Desc),
        _ => (ProductSort::Name, SortDir::Asc),
    }
}

/// Paged listing criteria with the scope predicate conjoined.
pub fn list_criteria(params: &ProductQuery, scope: &Scope) -> Criteria<Product> {
    let filter = ProductFilter {
        status: params.status,
        vendor_id: scope.vendor_id().map(String::from),
        brands: split_csv(&params.brands),
        types: split_csv(&params.types),
        search: params.search.clone(),
        min_price: params.min_price,
        max_price: params.max_price,
        ..Default::default()
    };
    let (key, dir) = parse_sort(&params.sort);
    Criteria::new(filter).sorted(key, dir).paged(Page::new(
        params.page_index.unwrap_or(1),
        params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    ))
}

/// Single-product lookup. A foreign vendor's product fails exactly like an
/// absent one.
pub fn lookup_criteria(id: ProductId, scope: &Scope) -> Criteria<Product> {
    Criteria::new(ProductFilter {
        id: Some(id),
        vendor_id: scope.vendor_id().map(String::from),
        ..Default::default()
    })
}

impl Aggregate for Product {
    type Id = ProductId;
    type Filter = ProductFilter;
    type Sort = ProductSort;
    type Projection = ProductProjection;

    const KIND: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }

    fn matches(&self, f: &ProductFilter) -> bool {
        if f.id.is_some_and(|id| id != self.id) {
            return false;
        }
        if f.status.is_some_and(|s| s != self.status) {
            return false;
        }
        if let Some(vendor) = &f.vendor_id {
            if self.vendor_id.as_deref() != Some(vendor.as_str()) {
                return false;
            }
        }
        if !f.brands.is_empty() && !f.brands.iter().any(|b| b == &self.brand) {
            return false;
        }
        if !f.types.is_empty() && !f.types.iter().any(|t| t == &self.product_type) {
            return false;
        }
        if let Some(term) = &f.search {
            let term = term.to_lowercase();
            let hit = self.name.to_lowercase().contains(&term)
                || self.brand.to_lowercase().contains(&term)
                || self.product_type.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        if f.min_price.is_some_and(|min| self.price < min) {
            return false;
        }
        if f.max_price.is_some_and(|max| self.price > max) {
            return false;
        }
        true
    }

    fn compare(&self, other: &Self, key: ProductSort) -> Ordering {
        match key {
            ProductSort::Name => self.name.cmp(&other.name),
            ProductSort::Price => self.price.cmp(&other.price),
        }
    }

    fn project(&self, projection: ProductProjection) -> Decimal {
        match projection {
            ProductProjection::StockValue => self.price * Decimal::from(self.quantity_in_stock),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::tests::draft;

    fn product(name: &str, price: i64, vendor: Option<&str>) -> Product {
        let mut p = Product::submit(draft(name, price), vendor.unwrap_or("v0"));
        p.vendor_id = vendor.map(String::from);
        p
    }

    #[test]
    fn vendor_predicate_excludes_foreign_and_catalog_products() {
        let filter = ProductFilter {
            vendor_id: Some("v1".into()),
            ..Default::default()
        };
        assert!(product("a", 10, Some("v1")).matches(&filter));
        assert!(!product("b", 10, Some("v2")).matches(&filter));
        assert!(!product("c", 10, None).matches(&filter));
    }

    #[test]
    fn search_spans_name_brand_and_type() {
        let p = product("Angular Speedster", 10, None);
        let term = |s: &str| ProductFilter {
            search: Some(s.into()),
            ..Default::default()
        };
        assert!(p.matches(&term("speed")));
        assert!(p.matches(&term("ACME"))); // brand, case-insensitive
        assert!(p.matches(&term("boards"))); // type
        assert!(!p.matches(&term("gloves")));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let p = product("a", 50, None);
        let f = ProductFilter {
            min_price: Some(Decimal::new(50, 0)),
            max_price: Some(Decimal::new(50, 0)),
            ..Default::default()
        };
        assert!(p.matches(&f));
        let f = ProductFilter {
            min_price: Some(Decimal::new(51, 0)),
            ..Default::default()
        };
        assert!(!p.matches(&f));
    }

    #[test]
    fn sort_strings_parse_like_the_storefront() {
        assert_eq!(
            parse_sort(&Some("priceDesc".into())),
            (ProductSort::Price, SortDir::Desc)
        );
        assert_eq!(parse_sort(&None), (ProductSort::Name, SortDir::Asc));
        assert_eq!(
            parse_sort(&Some("bogus".into())),
            (ProductSort::Name, SortDir::Asc)
        );
    }

    #[test]
    fn csv_filters_split_and_trim() {
        let params = ProductQuery {
            brands: Some("acme, globex ,".into()),
            ..Default::default()
        };
        let c = list_criteria(&params, &Scope::Admin);
        assert_eq!(c.filter.brands, vec!["acme".to_string(), "globex".to_string()]);
    }

    #[test]
    fn lookup_criteria_pins_id_and_scope() {
        let c = lookup_criteria(7, &Scope::Vendor("v9".into()));
        assert_eq!(c.filter.id, Some(7));
        assert_eq!(c.filter.vendor_id.as_deref(), Some("v9"));
        assert!(c.page.is_none());
    }
}
