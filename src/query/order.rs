//! Order criteria. Orders are an administrative read surface; the refund
//! workflow and dashboard reuse the same builders.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{Order, OrderId, OrderStatus};
use crate::repository::Aggregate;

use super::{Criteria, Load, Page, SortDir, DEFAULT_PAGE_SIZE};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderFilter {
    pub id: Option<OrderId>,
    pub status: Option<OrderStatus>,
    pub buyer_email: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSort {
    CreatedAt,
    Id,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderProjection {
    /// subtotal + delivery price, i.e. the amount actually charged.
    Revenue,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub buyer_email: Option<String>,
    pub page_index: Option<u32>,
    pub page_size: Option<u32>,
}

/// Paged listing, newest first. Line items stay unloaded on list pages.
pub fn list_criteria(params: &OrderQuery) -> Criteria<Order> {
    let filter = OrderFilter {
        status: params.status,
        buyer_email: params.buyer_email.clone(),
        ..Default::default()
    };
    Criteria::new(filter)
        .sorted(OrderSort::CreatedAt, SortDir::Desc)
        .paged(Page::new(
            params.page_index.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        ))
}

/// Single-order lookup with line items hydrated.
pub fn lookup_criteria(id: OrderId) -> Criteria<Order> {
    Criteria::new(OrderFilter {
        id: Some(id),
        ..Default::default()
    })
    .loading(Load { line_items: true })
}

impl Aggregate for Order {
    type Id = OrderId;
    type Filter = OrderFilter;
    type Sort = OrderSort;
    type Projection = OrderProjection;

    const KIND: &'static str = "order";

    fn id(&self) -> OrderId {
        self.id
    }

    fn matches(&self, f: &OrderFilter) -> bool {
        if f.id.is_some_and(|id| id != self.id) {
            return false;
        }
        if f.status.is_some_and(|s| s != self.status) {
            return false;
        }
        if let Some(buyer) = &f.buyer_email {
            if !self.buyer_email.eq_ignore_ascii_case(buyer) {
                return false;
            }
        }
        true
    }

    fn compare(&self, other: &Self, key: OrderSort) -> Ordering {
        match key {
            OrderSort::CreatedAt => self.created_at.cmp(&other.created_at),
            OrderSort::Id => self.id.cmp(&other.id),
        }
    }

    fn project(&self, projection: OrderProjection) -> Decimal {
        match projection {
            OrderProjection::Revenue => self.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::tests::order;

    #[test]
    fn status_filter_matches_exactly() {
        let f = OrderFilter {
            status: Some(OrderStatus::Refunded),
            ..Default::default()
        };
        assert!(order(1, OrderStatus::Refunded, 10, 0).matches(&f));
        assert!(!order(2, OrderStatus::Pending, 10, 0).matches(&f));
    }

    #[test]
    fn revenue_projection_includes_delivery() {
        let o = order(1, OrderStatus::PaymentReceived, 80, 15);
        assert_eq!(o.project(OrderProjection::Revenue), Decimal::new(95, 0));
    }

    #[test]
    fn lookup_hydrates_line_items() {
        let c = lookup_criteria(3);
        assert!(c.load.line_items);
        assert_eq!(c.filter.id, Some(3));
    }
}
