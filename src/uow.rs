//! Unit of work: the transactional boundary for one logical request.
//!
//! Owns one lazily-created repository per aggregate type. Services construct
//! a fresh unit of work per operation, so repositories are never shared
//! across independent requests. `complete` drains every staged mutation into
//! one atomic store commit; on failure the in-memory entities stay
//! mutated-but-unpersisted and the caller treats the operation as failed.

use std::sync::{Arc, OnceLock};

use crate::domain::{Order, Product};
use crate::error::Result;
use crate::repository::Repository;
use crate::store::{Committed, MarketStore, MutationBatch, Transact};

pub struct UnitOfWork<S: MarketStore> {
    store: Arc<S>,
    products: OnceLock<Repository<Product, S>>,
    orders: OnceLock<Repository<Order, S>>,
}

impl<S: MarketStore> UnitOfWork<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            products: OnceLock::new(),
            orders: OnceLock::new(),
        }
    }

    pub fn products(&self) -> &Repository<Product, S> {
        self.products
            .get_or_init(|| Repository::new(self.store.clone()))
    }

    pub fn orders(&self) -> &Repository<Order, S> {
        self.orders
            .get_or_init(|| Repository::new(self.store.clone()))
    }

    /// Persist every staged mutation across all repositories atomically.
    /// No implicit retries.
    pub async fn complete(&self) -> Result<Committed> {
        let batch = MutationBatch {
            products: self.products.get().map(Repository::drain).unwrap_or_default(),
            orders: self.orders.get().map(Repository::drain).unwrap_or_default(),
        };
        Transact::commit(&*self.store, batch).await
    }
}
