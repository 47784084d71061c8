//! Vendora - Multi-vendor Marketplace Backend
//!
//! Admin and vendor surfaces over a shared catalog and order book.
//!
//! ## Features
//! - Product submission and moderation (pending/approved/rejected/suspended)
//! - Ownership-scoped vendor catalog management
//! - Order administration with refunds through the payment processor
//! - Criteria-driven querying (filter, sort, paging, projections)
//! - Dashboard aggregates for admins and vendors

pub mod api;
pub mod domain;
pub mod error;
pub mod identity;
pub mod payment;
pub mod query;
pub mod repository;
pub mod services;
pub mod store;
pub mod uow;

pub use error::{ErrorKind, MarketError, Result};
