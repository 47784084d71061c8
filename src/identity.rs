//! Identity collaborator.
//!
//! The core never authenticates. It receives a resolved principal (stable id
//! plus role) from the fronting auth layer and turns it into a query scope.
//! The directory trait exists for the one admin-dashboard figure that lives
//! with the identity service: how many vendors are registered.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{MarketError, Result};
use crate::query::Scope;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Vendor,
    Customer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "vendor" => Some(Self::Vendor),
            "customer" => Some(Self::Customer),
            _ => None,
        }
    }
}

/// The calling principal as resolved by the authorization collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    /// Query scope for this principal; customers have no backstage scope.
    pub fn scope(&self) -> Option<Scope> {
        match self.role {
            Role::Admin => Some(Scope::Admin),
            Role::Vendor => Some(Scope::Vendor(self.user_id.clone())),
            Role::Customer => None,
        }
    }
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn vendor_count(&self) -> Result<u64>;
}

/// Directory backed by the identity service's HTTP API.
pub struct HttpIdentityDirectory {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RoleCount {
    count: u64,
}

impl HttpIdentityDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityDirectory for HttpIdentityDirectory {
    async fn vendor_count(&self) -> Result<u64> {
        let body: RoleCount = self
            .http
            .get(format!("{}/api/roles/vendor/count", self.base_url))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| MarketError::ExternalService(format!("identity directory: {e}")))?
            .json()
            .await
            .map_err(|e| MarketError::ExternalService(format!("identity directory: {e}")))?;
        Ok(body.count)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) struct FixedDirectory(pub u64);

    #[async_trait]
    impl IdentityDirectory for FixedDirectory {
        async fn vendor_count(&self) -> Result<u64> {
            Ok(self.0)
        }
    }
}
