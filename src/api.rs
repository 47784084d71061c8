//! HTTP surface.
//!
//! Thin shim over the services: routes mirror the operation table (admin
//! orders/moderation/dashboard, vendor CRUD/dashboard). Authentication lives
//! in front of this process; the shim only reads the principal headers the
//! auth proxy sets and turns them into an explicit caller scope.

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::domain::{Order, OrderId, Product, ProductDraft, ProductId};
use crate::error::{ErrorKind, MarketError};
use crate::identity::{IdentityDirectory, Principal, Role};
use crate::payment::PaymentGateway;
use crate::query::{OrderQuery, Paged, ProductQuery, Scope};
use crate::services::{AdminSummary, DashboardService, OrderService, ProductService, VendorSummary};
use crate::store::MarketStore;
use std::sync::Arc;

pub struct AppState<S: MarketStore> {
    pub products: ProductService<S>,
    pub orders: OrderService<S>,
    pub dashboard: DashboardService<S>,
}

impl<S: MarketStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
            orders: self.orders.clone(),
            dashboard: self.dashboard.clone(),
        }
    }
}

impl<S: MarketStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            products: ProductService::new(store.clone()),
            orders: OrderService::new(store.clone(), gateway),
            dashboard: DashboardService::new(store, identity),
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
            ErrorKind::Commit | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (status, body).into_response()
    }
}

fn principal_from(parts: &Parts) -> Result<Principal, (StatusCode, String)> {
    let unauthorized = || (StatusCode::UNAUTHORIZED, "missing principal".to_string());
    let user_id = parts
        .headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(unauthorized)?;
    let role = parts
        .headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(unauthorized)?;
    Ok(Principal {
        user_id: user_id.to_string(),
        role,
    })
}

/// Caller with the admin role.
pub struct AdminUser(pub Principal);

/// Caller with the vendor role; carries the vendor id used for scoping.
pub struct VendorUser(pub String);

#[axum::async_trait]
impl<St: Send + Sync> FromRequestParts<St> for AdminUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;
        if principal.role != Role::Admin {
            return Err((StatusCode::FORBIDDEN, "admin role required".to_string()));
        }
        Ok(Self(principal))
    }
}

#[axum::async_trait]
impl<St: Send + Sync> FromRequestParts<St> for VendorUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts)?;
        if principal.role != Role::Vendor {
            return Err((StatusCode::FORBIDDEN, "vendor role required".to_string()));
        }
        Ok(Self(principal.user_id))
    }
}

/// Vendor-supplied product fields. `status` and `vendor_id` are accepted but
/// deliberately dropped: moderation decides the first, the caller's identity
/// the second.
#[derive(Debug, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub picture_url: String,
    #[validate(length(min = 1))]
    pub product_type: String,
    #[validate(length(min = 1))]
    pub brand: String,
    pub quantity_in_stock: u32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
}

impl ProductPayload {
    fn into_draft(self) -> ProductDraft {
        ProductDraft {
            name: self.name,
            description: self.description,
            price: self.price,
            picture_url: self.picture_url,
            product_type: self.product_type,
            brand: self.brand,
            quantity_in_stock: self.quantity_in_stock,
        }
    }

    fn checked_draft(self) -> Result<ProductDraft, MarketError> {
        self.validate()
            .map_err(|e| MarketError::validation(e.to_string()))?;
        Ok(self.into_draft())
    }
}

pub fn router<S: MarketStore>(state: AppState<S>) -> Router {
    let admin = Router::new()
        .route("/orders", get(admin_list_orders::<S>))
        .route("/orders/:id", get(admin_get_order::<S>))
        .route("/orders/:id/refund", post(admin_refund_order::<S>))
        .route("/products", get(admin_list_products::<S>))
        .route("/products/:id", get(admin_get_product::<S>))
        .route("/products/:id/approve", post(admin_approve_product::<S>))
        .route("/products/:id/reject", post(admin_reject_product::<S>))
        .route("/products/:id/suspend", post(admin_suspend_product::<S>))
        .route("/dashboard", get(admin_dashboard::<S>));

    let vendor = Router::new()
        .route(
            "/products",
            get(vendor_list_products::<S>).post(vendor_create_product::<S>),
        )
        .route(
            "/products/:id",
            get(vendor_get_product::<S>)
                .put(vendor_update_product::<S>)
                .delete(vendor_delete_product::<S>),
        )
        .route("/dashboard", get(vendor_dashboard::<S>));

    Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({"status": "healthy", "service": "vendora"})) }),
        )
        .nest("/api/admin", admin)
        .nest("/api/vendor", vendor)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Admin handlers
// ---------------------------------------------------------------------------

async fn admin_list_orders<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Query(params): Query<OrderQuery>,
) -> Result<Json<Paged<Order>>, MarketError> {
    state.orders.list(&params).await.map(Json)
}

async fn admin_get_order<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, MarketError> {
    state.orders.get(id).await.map(Json)
}

async fn admin_refund_order<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, MarketError> {
    state.orders.refund(id).await.map(Json)
}

async fn admin_list_products<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Query(params): Query<ProductQuery>,
) -> Result<Json<Paged<Product>>, MarketError> {
    state.products.list(&params, &Scope::Admin).await.map(Json)
}

async fn admin_get_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, MarketError> {
    state.products.get(id, &Scope::Admin).await.map(Json)
}

async fn admin_approve_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, MarketError> {
    state.products.approve(id).await.map(Json)
}

async fn admin_reject_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, MarketError> {
    state.products.reject(id).await.map(Json)
}

async fn admin_suspend_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, MarketError> {
    state.products.suspend(id).await.map(Json)
}

async fn admin_dashboard<S: MarketStore>(
    State(state): State<AppState<S>>,
    AdminUser(_): AdminUser,
) -> Result<Json<AdminSummary>, MarketError> {
    state.dashboard.admin_summary().await.map(Json)
}

// ---------------------------------------------------------------------------
// Vendor handlers
// ---------------------------------------------------------------------------

async fn vendor_list_products<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
    Query(params): Query<ProductQuery>,
) -> Result<Json<Paged<Product>>, MarketError> {
    state
        .products
        .list(&params, &Scope::Vendor(vendor_id))
        .await
        .map(Json)
}

async fn vendor_get_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, MarketError> {
    state
        .products
        .get(id, &Scope::Vendor(vendor_id))
        .await
        .map(Json)
}

async fn vendor_create_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), MarketError> {
    let created = state
        .products
        .create(payload.checked_draft()?, &vendor_id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn vendor_update_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
    Path(id): Path<ProductId>,
    Json(payload): Json<ProductPayload>,
) -> Result<StatusCode, MarketError> {
    state
        .products
        .update(id, payload.checked_draft()?, &vendor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vendor_delete_product<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, MarketError> {
    state.products.delete(id, &vendor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vendor_dashboard<S: MarketStore>(
    State(state): State<AppState<S>>,
    VendorUser(vendor_id): VendorUser,
) -> Result<Json<VendorSummary>, MarketError> {
    state.dashboard.vendor_summary(&vendor_id).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::identity::testing::FixedDirectory;
    use crate::payment::testing::StubGateway;
    use crate::store::MemoryStore;

    fn app() -> Router {
        let store = Arc::new(MemoryStore::new());
        router(AppState::new(
            store,
            Arc::new(StubGateway::succeeding()),
            Arc::new(FixedDirectory(1)),
        ))
    }

    fn vendor_req(method: &str, uri: &str, vendor: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", vendor)
            .header("x-user-role", "vendor")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_ignores_client_supplied_status_and_owner() {
        let app = app();
        let payload = json!({
            "name": "Board",
            "description": "a thing",
            "price": "100",
            "picture_url": "/images/products/board.png",
            "product_type": "boards",
            "brand": "acme",
            "quantity_in_stock": 3,
            "status": "approved",
            "vendor_id": "v2"
        });
        let response = app
            .oneshot(vendor_req("POST", "/api/vendor/products", "v1", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["vendor_id"], "v1");
    }

    #[tokio::test]
    async fn missing_principal_headers_are_unauthorized() {
        let app = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vendor/products")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn vendors_cannot_reach_admin_routes() {
        let app = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/products")
                    .header("x-user-id", "v1")
                    .header("x-user-role", "vendor")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn foreign_vendor_lookup_reports_not_found() {
        let app = app();
        let payload = json!({
            "name": "Board",
            "description": "a thing",
            "price": "50",
            "picture_url": "/images/products/board.png",
            "product_type": "boards",
            "brand": "acme",
            "quantity_in_stock": 1
        });
        let response = app
            .clone()
            .oneshot(vendor_req("POST", "/api/vendor/products", "v1", payload))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/vendor/products/{id}"))
                    .header("x-user-id", "v2")
                    .header("x-user-role", "vendor")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "not_found");
    }
}
