//! Store contract the repository and unit of work execute against.
//!
//! A store evaluates criteria (filter + sort + paging + load directives) and
//! applies staged mutation batches atomically. Two implementations ship:
//! Postgres for production and an in-memory twin for development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Order, Product};
use crate::error::Result;
use crate::query::Criteria;
use crate::repository::{Aggregate, Mutation};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read operations over one aggregate type.
///
/// `count` and `sum` return scalars computed by the store; they must never
/// materialize the matching rows.
#[async_trait]
pub trait EntityStore<A: Aggregate>: Send + Sync + 'static {
    async fn by_id(&self, id: A::Id) -> Result<Option<A>>;
    async fn first(&self, criteria: &Criteria<A>) -> Result<Option<A>>;
    async fn list(&self, criteria: &Criteria<A>) -> Result<Vec<A>>;
    async fn count(&self, criteria: &Criteria<A>) -> Result<u64>;
    async fn sum(&self, criteria: &Criteria<A>, projection: A::Projection) -> Result<Decimal>;
}

/// Every staged mutation from one unit of work, across all aggregate types.
#[derive(Debug, Default)]
pub struct MutationBatch {
    pub products: Vec<Mutation<Product>>,
    pub orders: Vec<Mutation<Order>>,
}

impl MutationBatch {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.orders.is_empty()
    }
}

/// Entities created by a commit, with their store-assigned ids.
#[derive(Debug, Default)]
pub struct Committed {
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
}

/// Atomic commit primitive: either every staged add/update/remove in the
/// batch persists, or none do.
#[async_trait]
pub trait Transact: Send + Sync + 'static {
    async fn commit(&self, batch: MutationBatch) -> Result<Committed>;
}

/// The full store surface one backend provides.
pub trait MarketStore: EntityStore<Product> + EntityStore<Order> + Transact {}

impl<T: EntityStore<Product> + EntityStore<Order> + Transact> MarketStore for T {}
