//! Order operations: administrative reads and the refund workflow.
//!
//! The refund guard is strict: only PaymentReceived qualifies. Pending means
//! nothing was captured; Refunded must not reach the processor twice. The
//! gateway is called exactly once, and only after the guard passes.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{Order, OrderId, OrderStatus};
use crate::error::{MarketError, Result};
use crate::payment::{PaymentGateway, RefundOutcome};
use crate::query::{self, OrderQuery, Paged};
use crate::store::MarketStore;
use crate::uow::UnitOfWork;

pub struct OrderService<S: MarketStore> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S: MarketStore> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

impl<S: MarketStore> OrderService<S> {
    pub fn new(store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    fn uow(&self) -> UnitOfWork<S> {
        UnitOfWork::new(self.store.clone())
    }

    pub async fn list(&self, params: &OrderQuery) -> Result<Paged<Order>> {
        let uow = self.uow();
        let criteria = query::order::list_criteria(params);
        let data = uow.orders().list(&criteria).await?;
        let total = uow.orders().count(&criteria).await?;
        Ok(Paged::new(data, total, criteria.page))
    }

    pub async fn get(&self, id: OrderId) -> Result<Order> {
        let uow = self.uow();
        uow.orders()
            .get_with_spec(&query::order::lookup_criteria(id))
            .await?
            .ok_or(MarketError::not_found("order"))
    }

    /// Refund through the external processor, then record it locally.
    pub async fn refund(&self, id: OrderId) -> Result<Order> {
        let uow = self.uow();
        let mut order = uow
            .orders()
            .get_with_spec(&query::order::lookup_criteria(id))
            .await?
            .ok_or(MarketError::not_found("order"))?;

        match order.status {
            OrderStatus::Pending => {
                return Err(MarketError::validation("no payment captured for this order"));
            }
            OrderStatus::Refunded => {
                return Err(MarketError::validation("order has already been refunded"));
            }
            OrderStatus::PaymentReceived => {}
        }

        match self.gateway.refund(&order.payment_intent_id).await {
            RefundOutcome::Succeeded => {
                order.status = OrderStatus::Refunded;
                uow.orders().update(order.clone());
                if let Err(e) = uow.complete().await {
                    // The processor refunded but we could not record it; this
                    // window needs reconciliation tooling, not a retry here.
                    error!(
                        order_id = id,
                        payment_intent_id = %order.payment_intent_id,
                        "refund succeeded externally but commit failed: {e}"
                    );
                    return Err(e);
                }
                info!(order_id = id, "order refunded");
                Ok(order)
            }
            RefundOutcome::Declined { reason } => {
                warn!(order_id = id, reason, "refund declined");
                Err(MarketError::ExternalService(format!(
                    "refund declined: {reason}"
                )))
            }
            RefundOutcome::Error { detail } => {
                warn!(order_id = id, detail, "refund errored");
                Err(MarketError::ExternalService(detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::tests::order;
    use crate::error::ErrorKind;
    use crate::payment::testing::StubGateway;
    use crate::store::MemoryStore;

    async fn seeded(statuses: &[OrderStatus]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let uow = UnitOfWork::new(store.clone());
        for (i, status) in statuses.iter().enumerate() {
            uow.orders().add(order(0, *status, 50 + i as i64, 10));
        }
        uow.complete().await.expect("seed");
        store
    }

    #[tokio::test]
    async fn refunding_a_pending_order_never_calls_the_gateway() {
        let store = seeded(&[OrderStatus::Pending]).await;
        let gateway = Arc::new(StubGateway::succeeding());
        let svc = OrderService::new(store, gateway.clone());

        let err = svc.refund(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gateway.calls(), 0);

        let unchanged = svc.get(1).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn refunding_an_already_refunded_order_never_calls_the_gateway() {
        let store = seeded(&[OrderStatus::Refunded]).await;
        let gateway = Arc::new(StubGateway::succeeding());
        let svc = OrderService::new(store, gateway.clone());

        let err = svc.refund(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn successful_refund_persists_the_transition() {
        let store = seeded(&[OrderStatus::PaymentReceived]).await;
        let gateway = Arc::new(StubGateway::succeeding());
        let svc = OrderService::new(store, gateway.clone());

        let refunded = svc.refund(1).await.unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(gateway.calls(), 1);

        let persisted = svc.get(1).await.unwrap();
        assert_eq!(persisted.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn declined_refund_changes_nothing() {
        let store = seeded(&[OrderStatus::PaymentReceived]).await;
        let gateway = Arc::new(StubGateway::declining("insufficient_funds"));
        let svc = OrderService::new(store, gateway.clone());

        let err = svc.refund(1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert_eq!(gateway.calls(), 1);

        let unchanged = svc.get(1).await.unwrap();
        assert_eq!(unchanged.status, OrderStatus::PaymentReceived);
    }

    #[tokio::test]
    async fn refunding_a_missing_order_is_not_found() {
        let store = seeded(&[]).await;
        let gateway = Arc::new(StubGateway::succeeding());
        let svc = OrderService::new(store, gateway.clone());

        let err = svc.refund(99).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn listing_orders_pages_and_counts() {
        let store = seeded(&[
            OrderStatus::Pending,
            OrderStatus::PaymentReceived,
            OrderStatus::PaymentReceived,
        ])
        .await;
        let svc = OrderService::new(store, Arc::new(StubGateway::succeeding()));

        let params = OrderQuery {
            status: Some(OrderStatus::PaymentReceived),
            page_size: Some(1),
            ..Default::default()
        };
        let page = svc.list(&params).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.total, 2);
    }
}
