//! In-memory store.
//!
//! Same contract as the Postgres store, backed by maps behind an async lock.
//! Used by the test suites and handy for local development without a
//! database. Criteria evaluation delegates to the aggregate's own
//! `matches`/`compare`/`project`, so predicate semantics cannot drift between
//! backends by construction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderId, Product, ProductId};
use crate::error::{MarketError, Result};
use crate::query::{Criteria, SortDir};
use crate::repository::{Aggregate, Mutation};

use super::{Committed, EntityStore, MutationBatch, Transact};

#[derive(Debug)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    next_product_id: ProductId,
    next_order_id: OrderId,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                products: BTreeMap::new(),
                orders: BTreeMap::new(),
                next_product_id: 1,
                next_order_id: 1,
            }),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filter, sort and page a snapshot according to the criteria.
fn evaluate<A: Aggregate>(items: impl Iterator<Item = A>, criteria: &Criteria<A>) -> Vec<A> {
    let mut matched: Vec<A> = items.filter(|a| a.matches(&criteria.filter)).collect();
    if let Some(sort) = criteria.sort {
        matched.sort_by(|x, y| {
            let ord = x.compare(y, sort.key);
            match sort.dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            }
        });
    }
    match criteria.page {
        Some(page) => matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size() as usize)
            .collect(),
        None => matched,
    }
}

macro_rules! memory_entity_store {
    ($entity:ty, $table:ident) => {
        #[async_trait]
        impl EntityStore<$entity> for MemoryStore {
            async fn by_id(&self, id: <$entity as Aggregate>::Id) -> Result<Option<$entity>> {
                Ok(self.inner.read().await.$table.get(&id).cloned())
            }

            async fn first(&self, criteria: &Criteria<$entity>) -> Result<Option<$entity>> {
                let inner = self.inner.read().await;
                Ok(evaluate(inner.$table.values().cloned(), criteria)
                    .into_iter()
                    .next())
            }

            async fn list(&self, criteria: &Criteria<$entity>) -> Result<Vec<$entity>> {
                let inner = self.inner.read().await;
                Ok(evaluate(inner.$table.values().cloned(), criteria))
            }

            async fn count(&self, criteria: &Criteria<$entity>) -> Result<u64> {
                let inner = self.inner.read().await;
                Ok(inner
                    .$table
                    .values()
                    .filter(|a| a.matches(&criteria.filter))
                    .count() as u64)
            }

            async fn sum(
                &self,
                criteria: &Criteria<$entity>,
                projection: <$entity as Aggregate>::Projection,
            ) -> Result<Decimal> {
                let inner = self.inner.read().await;
                Ok(inner
                    .$table
                    .values()
                    .filter(|a| a.matches(&criteria.filter))
                    .map(|a| a.project(projection))
                    .sum())
            }
        }
    };
}

memory_entity_store!(Product, products);
memory_entity_store!(Order, orders);

fn check_targets<A: Aggregate>(
    mutations: &[Mutation<A>],
    exists: impl Fn(A::Id) -> bool,
) -> Result<()> {
    for m in mutations {
        if let Mutation::Update(e) | Mutation::Remove(e) = m {
            if !exists(e.id()) {
                return Err(MarketError::Commit(format!(
                    "{} {} does not exist",
                    A::KIND,
                    e.id()
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Transact for MemoryStore {
    async fn commit(&self, batch: MutationBatch) -> Result<Committed> {
        let mut inner = self.inner.write().await;

        // Validate the whole batch against current state before touching it,
        // so a failing batch leaves the store unchanged.
        check_targets(&batch.products, |id| inner.products.contains_key(&id))?;
        check_targets(&batch.orders, |id| inner.orders.contains_key(&id))?;

        let mut committed = Committed::default();
        for m in batch.products {
            match m {
                Mutation::Add(mut p) => {
                    p.id = inner.next_product_id;
                    inner.next_product_id += 1;
                    inner.products.insert(p.id, p.clone());
                    committed.products.push(p);
                }
                Mutation::Update(p) => {
                    inner.products.insert(p.id, p);
                }
                Mutation::Remove(p) => {
                    inner.products.remove(&p.id);
                }
            }
        }
        for m in batch.orders {
            match m {
                Mutation::Add(mut o) => {
                    o.id = inner.next_order_id;
                    inner.next_order_id += 1;
                    inner.orders.insert(o.id, o.clone());
                    committed.orders.push(o);
                }
                Mutation::Update(o) => {
                    inner.orders.insert(o.id, o);
                }
                Mutation::Remove(o) => {
                    inner.orders.remove(&o.id);
                }
            }
        }
        Ok(committed)
    }
}
