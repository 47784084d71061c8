//! Generic repository over any aggregate type.
//!
//! Reads execute a [`Criteria`] against the backing store; writes are staged
//! locally and only persisted when the owning unit of work commits.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::error::Result;
use crate::query::Criteria;
use crate::store::EntityStore;

/// An entity treated as the unit of consistency for mutation and commit.
///
/// The associated types describe how the aggregate is queried; `matches`,
/// `compare` and `project` give stores that evaluate criteria in memory a
/// single source of truth for predicate semantics. SQL-backed stores translate
/// the same filter instead.
pub trait Aggregate: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + Send + Sync;
    type Filter: Clone + PartialEq + Default + fmt::Debug + Send + Sync;
    type Sort: Copy + PartialEq + fmt::Debug + Send + Sync;
    type Projection: Copy + Send + Sync;

    /// Entity name used in not-found reports and logs.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
    fn matches(&self, filter: &Self::Filter) -> bool;
    fn compare(&self, other: &Self, key: Self::Sort) -> Ordering;
    fn project(&self, projection: Self::Projection) -> Decimal;
}

/// A staged change, not yet persisted.
#[derive(Clone, Debug)]
pub enum Mutation<A> {
    Add(A),
    Update(A),
    Remove(A),
}

/// Repository parameterized over an aggregate type.
///
/// `add`/`update`/`remove` only stage mutations; the unit of work drains them
/// into one atomic commit.
pub struct Repository<A: Aggregate, S> {
    store: Arc<S>,
    staged: Mutex<Vec<Mutation<A>>>,
}

impl<A: Aggregate, S: EntityStore<A>> Repository<A, S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        Self {
            store,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Unscoped fetch by id. Role-scoped lookups must go through
    /// [`Repository::get_with_spec`] so the scoping predicate applies.
    pub async fn get_by_id(&self, id: A::Id) -> Result<Option<A>> {
        self.store.by_id(id).await
    }

    /// First entity matching the criteria (filter + scope + load directives).
    pub async fn get_with_spec(&self, criteria: &Criteria<A>) -> Result<Option<A>> {
        self.store.first(criteria).await
    }

    /// Ordered, paged sequence of matches. Total count is a separate call.
    pub async fn list(&self, criteria: &Criteria<A>) -> Result<Vec<A>> {
        self.store.list(criteria).await
    }

    /// Number of entities matching the filter predicate. Paging bounds on the
    /// criteria are stripped before execution, so the count always reflects
    /// the same predicate as the paged listing.
    pub async fn count(&self, criteria: &Criteria<A>) -> Result<u64> {
        let unpaged = criteria.clone().without_paging();
        self.store.count(&unpaged).await
    }

    /// Sum of a numeric projection over all matches, computed by the store.
    pub async fn sum(&self, criteria: &Criteria<A>, projection: A::Projection) -> Result<Decimal> {
        let unpaged = criteria.clone().without_paging();
        self.store.sum(&unpaged, projection).await
    }

    pub fn add(&self, entity: A) {
        self.stage(Mutation::Add(entity));
    }

    pub fn update(&self, entity: A) {
        self.stage(Mutation::Update(entity));
    }

    pub fn remove(&self, entity: A) {
        self.stage(Mutation::Remove(entity));
    }

    fn stage(&self, mutation: Mutation<A>) {
        self.staged.lock().expect("staging lock poisoned").push(mutation);
    }

    pub(crate) fn drain(&self) -> Vec<Mutation<A>> {
        std::mem::take(&mut *self.staged.lock().expect("staging lock poisoned"))
    }
}
