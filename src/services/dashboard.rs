//! Dashboard summaries.
//!
//! Every figure is an aggregate query: one parameterized count per status
//! value and one sum for revenue, all built by the same criteria functions
//! the list endpoints use. Nothing here loads entities to count them.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::ProductStatus;
use crate::error::Result;
use crate::identity::IdentityDirectory;
use crate::query::{self, Criteria, OrderFilter, OrderProjection, ProductQuery, Scope};
use crate::store::MarketStore;
use crate::uow::UnitOfWork;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub suspended: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected + self.suspended
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AdminSummary {
    pub total_products: u64,
    pub products: StatusCounts,
    pub vendor_count: u64,
    pub total_revenue: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct VendorSummary {
    pub total_products: u64,
    pub products: StatusCounts,
}

pub struct DashboardService<S: MarketStore> {
    store: Arc<S>,
    identity: Arc<dyn IdentityDirectory>,
}

impl<S: MarketStore> Clone for DashboardService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl<S: MarketStore> DashboardService<S> {
    pub fn new(store: Arc<S>, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self { store, identity }
    }

    pub async fn admin_summary(&self) -> Result<AdminSummary> {
        let uow = UnitOfWork::new(self.store.clone());
        let products = status_counts(&uow, &Scope::Admin).await?;
        let total_products = count_products(&uow, None, &Scope::Admin).await?;
        let total_revenue = uow
            .orders()
            .sum(
                &Criteria::new(OrderFilter::default()),
                OrderProjection::Revenue,
            )
            .await?;
        let vendor_count = self.identity.vendor_count().await?;
        Ok(AdminSummary {
            total_products,
            products,
            vendor_count,
            total_revenue,
        })
    }

    pub async fn vendor_summary(&self, vendor_id: &str) -> Result<VendorSummary> {
        let uow = UnitOfWork::new(self.store.clone());
        let scope = Scope::Vendor(vendor_id.to_string());
        let products = status_counts(&uow, &scope).await?;
        let total_products = count_products(&uow, None, &scope).await?;
        Ok(VendorSummary {
            total_products,
            products,
        })
    }
}

/// One count query per status value, all through the same criteria builder.
async fn status_counts<S: MarketStore>(uow: &UnitOfWork<S>, scope: &Scope) -> Result<StatusCounts> {
    let mut counts = StatusCounts::default();
    for status in ProductStatus::ALL {
        let n = count_products(uow, Some(status), scope).await?;
        match status {
            ProductStatus::Pending => counts.pending = n,
            ProductStatus::Approved => counts.approved = n,
            ProductStatus::Rejected => counts.rejected = n,
            ProductStatus::Suspended => counts.suspended = n,
        }
    }
    Ok(counts)
}

async fn count_products<S: MarketStore>(
    uow: &UnitOfWork<S>,
    status: Option<ProductStatus>,
    scope: &Scope,
) -> Result<u64> {
    let params = ProductQuery {
        status,
        ..Default::default()
    };
    uow.products()
        .count(&query::product::list_criteria(&params, scope))
        .await
}
