//! Product operations: vendor CRUD plus the admin moderation transitions.
//!
//! Vendor reads and writes go through ownership-scoped criteria, so a foreign
//! product is indistinguishable from a missing one. Moderation transitions
//! use unscoped lookups and may move a product to any status.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{Product, ProductDraft, ProductId, ProductStatus};
use crate::error::{MarketError, Result};
use crate::query::{self, Paged, ProductQuery, Scope};
use crate::store::MarketStore;
use crate::uow::UnitOfWork;

pub struct ProductService<S: MarketStore> {
    store: Arc<S>,
}

impl<S: MarketStore> Clone for ProductService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MarketStore> ProductService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn uow(&self) -> UnitOfWork<S> {
        UnitOfWork::new(self.store.clone())
    }

    pub async fn list(&self, params: &ProductQuery, scope: &Scope) -> Result<Paged<Product>> {
        let uow = self.uow();
        let criteria = query::product::list_criteria(params, scope);
        let data = uow.products().list(&criteria).await?;
        let total = uow.products().count(&criteria).await?;
        Ok(Paged::new(data, total, criteria.page))
    }

    pub async fn get(&self, id: ProductId, scope: &Scope) -> Result<Product> {
        let uow = self.uow();
        uow.products()
            .get_with_spec(&query::product::lookup_criteria(id, scope))
            .await?
            .ok_or(MarketError::not_found("product"))
    }

    /// Vendor submission. Whatever status or owner the caller imagined, the
    /// stored product is Pending and owned by the caller.
    pub async fn create(&self, draft: ProductDraft, vendor_id: &str) -> Result<Product> {
        validate_draft(&draft)?;
        let uow = self.uow();
        uow.products().add(Product::submit(draft, vendor_id));
        let committed = uow.complete().await?;
        let product = committed
            .products
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::Commit("store returned no created product".into()))?;
        info!(product_id = product.id, vendor_id, "product submitted for review");
        Ok(product)
    }

    /// Vendor edit: only while not Approved; a successful edit goes back to
    /// Pending for re-review.
    pub async fn update(&self, id: ProductId, draft: ProductDraft, vendor_id: &str) -> Result<()> {
        validate_draft(&draft)?;
        let uow = self.uow();
        let scope = Scope::Vendor(vendor_id.to_string());
        let mut product = uow
            .products()
            .get_with_spec(&query::product::lookup_criteria(id, &scope))
            .await?
            .ok_or(MarketError::not_found("product"))?;

        if !product.is_editable() {
            return Err(MarketError::validation(
                "cannot update an approved product; submit a new product instead",
            ));
        }

        product.apply_draft(draft);
        uow.products().update(product);
        uow.complete().await?;
        info!(product_id = id, vendor_id, "product updated, back to review");
        Ok(())
    }

    /// Vendor delete, allowed in any status, Approved included.
    pub async fn delete(&self, id: ProductId, vendor_id: &str) -> Result<()> {
        let uow = self.uow();
        let scope = Scope::Vendor(vendor_id.to_string());
        let product = uow
            .products()
            .get_with_spec(&query::product::lookup_criteria(id, &scope))
            .await?
            .ok_or(MarketError::not_found("product"))?;
        uow.products().remove(product);
        uow.complete().await?;
        info!(product_id = id, vendor_id, "product deleted");
        Ok(())
    }

    pub async fn approve(&self, id: ProductId) -> Result<Product> {
        self.moderate(id, ProductStatus::Approved).await
    }

    pub async fn reject(&self, id: ProductId) -> Result<Product> {
        self.moderate(id, ProductStatus::Rejected).await
    }

    pub async fn suspend(&self, id: ProductId) -> Result<Product> {
        self.moderate(id, ProductStatus::Suspended).await
    }

    /// Admin transition: unconditional from any current status.
    async fn moderate(&self, id: ProductId, status: ProductStatus) -> Result<Product> {
        let uow = self.uow();
        let mut product = uow
            .products()
            .get_by_id(id)
            .await?
            .ok_or(MarketError::not_found("product"))?;
        product.set_status(status);
        uow.products().update(product.clone());
        uow.complete().await?;
        info!(product_id = id, status = status.as_str(), "product moderated");
        Ok(product)
    }
}

fn validate_draft(draft: &ProductDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        return Err(MarketError::validation("product name must not be empty"));
    }
    if draft.price < Decimal::ZERO {
        return Err(MarketError::validation("price must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::tests::draft;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    fn service() -> ProductService<MemoryStore> {
        ProductService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_stamps_pending_and_owner() {
        let svc = service();
        let created = svc.create(draft("Board", 100), "v1").await.unwrap();
        assert_eq!(created.status, ProductStatus::Pending);
        assert_eq!(created.vendor_id.as_deref(), Some("v1"));
        assert!(created.id > 0);
    }

    #[tokio::test]
    async fn vendor_scope_never_leaks_foreign_products() {
        let svc = service();
        let created = svc.create(draft("Board", 100), "v1").await.unwrap();

        let err = svc
            .get(created.id, &Scope::Vendor("v2".into()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let listed = svc
            .list(&ProductQuery::default(), &Scope::Vendor("v2".into()))
            .await
            .unwrap();
        assert!(listed.data.is_empty());
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn moderation_transitions_from_any_state() {
        let svc = service();
        let p = svc.create(draft("Board", 100), "v1").await.unwrap();

        let p2 = svc.approve(p.id).await.unwrap();
        assert_eq!(p2.status, ProductStatus::Approved);
        let p3 = svc.suspend(p.id).await.unwrap();
        assert_eq!(p3.status, ProductStatus::Suspended);
        let p4 = svc.reject(p.id).await.unwrap();
        assert_eq!(p4.status, ProductStatus::Rejected);
    }

    #[tokio::test]
    async fn moderating_a_missing_product_is_not_found() {
        let svc = service();
        let err = svc.approve(42).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn updating_an_approved_product_fails_and_changes_nothing() {
        let svc = service();
        let p = svc.create(draft("Board", 100), "v1").await.unwrap();
        svc.approve(p.id).await.unwrap();

        let err = svc
            .update(p.id, draft("Hacked", 1), "v1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let unchanged = svc.get(p.id, &Scope::Admin).await.unwrap();
        assert_eq!(unchanged.name, "Board");
        assert_eq!(unchanged.status, ProductStatus::Approved);
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_resets_to_pending() {
        let svc = service();
        let p = svc.create(draft("Board", 100), "v1").await.unwrap();
        svc.reject(p.id).await.unwrap();

        svc.update(p.id, draft("Board v2", 120), "v1").await.unwrap();
        let updated = svc.get(p.id, &Scope::Vendor("v1".into())).await.unwrap();
        assert_eq!(updated.name, "Board v2");
        assert_eq!(updated.status, ProductStatus::Pending);
    }

    #[tokio::test]
    async fn delete_is_allowed_even_when_approved() {
        let svc = service();
        let p = svc.create(draft("Board", 100), "v1").await.unwrap();
        svc.approve(p.id).await.unwrap();

        svc.delete(p.id, "v1").await.unwrap();
        let err = svc.get(p.id, &Scope::Admin).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_is_ownership_scoped() {
        let svc = service();
        let p = svc.create(draft("Board", 100), "v1").await.unwrap();
        let err = svc.delete(p.id, "v2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn drafts_are_validated() {
        let svc = service();
        let mut bad = draft("", 10);
        bad.name = "  ".into();
        assert_eq!(
            svc.create(bad, "v1").await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut negative = draft("Board", 10);
        negative.price = Decimal::new(-5, 0);
        assert_eq!(
            svc.create(negative, "v1").await.unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
