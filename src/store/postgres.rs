//! Postgres store.
//!
//! Translates criteria into parameterized SQL. Counts and sums run as
//! scalar queries; staged mutation batches apply inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::types::Json;

use crate::domain::{Delivery, Order, OrderId, OrderItem, OrderStatus, Product, ProductId, ProductStatus};
use crate::error::{MarketError, Result};
use crate::query::{
    Criteria, OrderFilter, OrderProjection, OrderSort, ProductFilter, ProductProjection,
    ProductSort, Sort, SortDir,
};
use crate::repository::Mutation;

use super::{Committed, EntityStore, MutationBatch, Transact};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn storage(e: sqlx::Error) -> MarketError {
    MarketError::Storage(e.to_string())
}

fn commit_err(e: sqlx::Error) -> MarketError {
    MarketError::Commit(e.to_string())
}

/// Bind values collected while rendering a WHERE clause.
enum Arg {
    I64(i64),
    Text(String),
    TextArray(Vec<String>),
    Num(Decimal),
}

macro_rules! bind_args {
    ($query:expr, $args:expr) => {{
        let mut q = $query;
        for arg in $args {
            q = match arg {
                Arg::I64(v) => q.bind(v),
                Arg::Text(v) => q.bind(v),
                Arg::TextArray(v) => q.bind(v),
                Arg::Num(v) => q.bind(v),
            };
        }
        q
    }};
}

fn render_where(conds: Vec<String>) -> String {
    if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds.join(" AND "))
    }
}

fn render_page(criteria_page: Option<crate::query::Page>) -> String {
    match criteria_page {
        Some(p) => format!(" LIMIT {} OFFSET {}", p.size(), p.offset()),
        None => String::new(),
    }
}

fn dir_sql(dir: SortDir) -> &'static str {
    match dir {
        SortDir::Asc => "ASC",
        SortDir::Desc => "DESC",
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: Decimal,
    picture_url: String,
    product_type: String,
    brand: String,
    quantity_in_stock: i32,
    status: String,
    vendor_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = MarketError;

    fn try_from(row: ProductRow) -> Result<Product> {
        let status = ProductStatus::parse(&row.status)
            .ok_or_else(|| MarketError::Storage(format!("bad product status {:?}", row.status)))?;
        let quantity_in_stock = u32::try_from(row.quantity_in_stock)
            .map_err(|_| MarketError::Storage("negative quantity_in_stock".into()))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            picture_url: row.picture_url,
            product_type: row.product_type,
            brand: row.brand,
            quantity_in_stock,
            status,
            vendor_id: row.vendor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn product_where(f: &ProductFilter, args: &mut Vec<Arg>) -> String {
    let mut conds = Vec::new();
    if let Some(id) = f.id {
        args.push(Arg::I64(id));
        conds.push(format!("id = ${}", args.len()));
    }
    if let Some(status) = f.status {
        args.push(Arg::Text(status.as_str().to_string()));
        conds.push(format!("status = ${}", args.len()));
    }
    if let Some(vendor) = &f.vendor_id {
        args.push(Arg::Text(vendor.clone()));
        conds.push(format!("vendor_id = ${}", args.len()));
    }
    if !f.brands.is_empty() {
        args.push(Arg::TextArray(f.brands.clone()));
        conds.push(format!("brand = ANY(${})", args.len()));
    }
    if !f.types.is_empty() {
        args.push(Arg::TextArray(f.types.clone()));
        conds.push(format!("product_type = ANY(${})", args.len()));
    }
    if let Some(term) = &f.search {
        args.push(Arg::Text(format!("%{term}%")));
        let n = args.len();
        conds.push(format!(
            "(name ILIKE ${n} OR brand ILIKE ${n} OR product_type ILIKE ${n})"
        ));
    }
    if let Some(min) = f.min_price {
        args.push(Arg::Num(min));
        conds.push(format!("price >= ${}", args.len()));
    }
    if let Some(max) = f.max_price {
        args.push(Arg::Num(max));
        conds.push(format!("price <= ${}", args.len()));
    }
    render_where(conds)
}

fn product_order(sort: Option<Sort<ProductSort>>) -> String {
    let (col, dir) = match sort {
        Some(s) => {
            let col = match s.key {
                ProductSort::Name => "name",
                ProductSort::Price => "price",
            };
            (col, dir_sql(s.dir))
        }
        None => ("id", "ASC"),
    };
    format!(" ORDER BY {col} {dir}, id ASC")
}

const PRODUCT_COLS: &str = "id, name, description, price, picture_url, product_type, brand, \
                            quantity_in_stock, status, vendor_id, created_at, updated_at";

async fn fetch_products(pool: &PgPool, criteria: &Criteria<Product>) -> Result<Vec<Product>> {
    let mut args = Vec::new();
    let sql = format!(
        "SELECT {PRODUCT_COLS} FROM products{}{}{}",
        product_where(&criteria.filter, &mut args),
        product_order(criteria.sort),
        render_page(criteria.page),
    );
    let rows: Vec<ProductRow> = bind_args!(sqlx::query_as(&sql), args)
        .fetch_all(pool)
        .await
        .map_err(storage)?;
    rows.into_iter().map(Product::try_from).collect()
}

#[async_trait]
impl EntityStore<Product> for PgStore {
    async fn by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Product::try_from).transpose()
    }

    async fn first(&self, criteria: &Criteria<Product>) -> Result<Option<Product>> {
        let mut limited = criteria.clone();
        limited.page = Some(crate::query::Page::new(1, 1));
        Ok(fetch_products(&self.pool, &limited).await?.into_iter().next())
    }

    async fn list(&self, criteria: &Criteria<Product>) -> Result<Vec<Product>> {
        fetch_products(&self.pool, criteria).await
    }

    async fn count(&self, criteria: &Criteria<Product>) -> Result<u64> {
        let mut args = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM products{}",
            product_where(&criteria.filter, &mut args)
        );
        let n: i64 = bind_args!(sqlx::query_scalar(&sql), args)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(n as u64)
    }

    async fn sum(
        &self,
        criteria: &Criteria<Product>,
        projection: ProductProjection,
    ) -> Result<Decimal> {
        let expr = match projection {
            ProductProjection::StockValue => "price * quantity_in_stock",
        };
        let mut args = Vec::new();
        let sql = format!(
            "SELECT COALESCE(SUM({expr}), 0) FROM products{}",
            product_where(&criteria.filter, &mut args)
        );
        bind_args!(sqlx::query_scalar(&sql), args)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    buyer_email: String,
    delivery_name: String,
    delivery_price: Decimal,
    items: Json<Vec<OrderItem>>,
    subtotal: Decimal,
    payment_intent_id: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = MarketError;

    fn try_from(row: OrderRow) -> Result<Order> {
        let status = OrderStatus::parse(&row.status)
            .ok_or_else(|| MarketError::Storage(format!("bad order status {:?}", row.status)))?;
        Ok(Order {
            id: row.id,
            buyer_email: row.buyer_email,
            delivery: Delivery {
                name: row.delivery_name,
                price: row.delivery_price,
            },
            items: row.items.0,
            subtotal: row.subtotal,
            payment_intent_id: row.payment_intent_id,
            status,
            created_at: row.created_at,
        })
    }
}

fn order_where(f: &OrderFilter, args: &mut Vec<Arg>) -> String {
    let mut conds = Vec::new();
    if let Some(id) = f.id {
        args.push(Arg::I64(id));
        conds.push(format!("id = ${}", args.len()));
    }
    if let Some(status) = f.status {
        args.push(Arg::Text(status.as_str().to_string()));
        conds.push(format!("status = ${}", args.len()));
    }
    if let Some(buyer) = &f.buyer_email {
        args.push(Arg::Text(buyer.clone()));
        conds.push(format!("LOWER(buyer_email) = LOWER(${})", args.len()));
    }
    render_where(conds)
}

fn order_order_by(sort: Option<Sort<OrderSort>>) -> String {
    let (col, dir) = match sort {
        Some(s) => {
            let col = match s.key {
                OrderSort::CreatedAt => "created_at",
                OrderSort::Id => "id",
            };
            (col, dir_sql(s.dir))
        }
        None => ("id", "ASC"),
    };
    format!(" ORDER BY {col} {dir}, id ASC")
}

/// Line items hydrate only when the criteria asks for them.
fn order_cols(load_items: bool) -> String {
    let items = if load_items { "items" } else { "'[]'::jsonb AS items" };
    format!(
        "id, buyer_email, delivery_name, delivery_price, {items}, subtotal, \
         payment_intent_id, status, created_at"
    )
}

async fn fetch_orders(pool: &PgPool, criteria: &Criteria<Order>) -> Result<Vec<Order>> {
    let mut args = Vec::new();
    let sql = format!(
        "SELECT {} FROM orders{}{}{}",
        order_cols(criteria.load.line_items),
        order_where(&criteria.filter, &mut args),
        order_order_by(criteria.sort),
        render_page(criteria.page),
    );
    let rows: Vec<OrderRow> = bind_args!(sqlx::query_as(&sql), args)
        .fetch_all(pool)
        .await
        .map_err(storage)?;
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl EntityStore<Order> for PgStore {
    async fn by_id(&self, id: OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = $1", order_cols(true));
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Order::try_from).transpose()
    }

    async fn first(&self, criteria: &Criteria<Order>) -> Result<Option<Order>> {
        let mut limited = criteria.clone();
        limited.page = Some(crate::query::Page::new(1, 1));
        Ok(fetch_orders(&self.pool, &limited).await?.into_iter().next())
    }

    async fn list(&self, criteria: &Criteria<Order>) -> Result<Vec<Order>> {
        fetch_orders(&self.pool, criteria).await
    }

    async fn count(&self, criteria: &Criteria<Order>) -> Result<u64> {
        let mut args = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM orders{}",
            order_where(&criteria.filter, &mut args)
        );
        let n: i64 = bind_args!(sqlx::query_scalar(&sql), args)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(n as u64)
    }

    async fn sum(&self, criteria: &Criteria<Order>, projection: OrderProjection) -> Result<Decimal> {
        let expr = match projection {
            OrderProjection::Revenue => "subtotal + delivery_price",
        };
        let mut args = Vec::new();
        let sql = format!(
            "SELECT COALESCE(SUM({expr}), 0) FROM orders{}",
            order_where(&criteria.filter, &mut args)
        );
        bind_args!(sqlx::query_scalar(&sql), args)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

fn quantity_i32(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| MarketError::Commit("quantity_in_stock overflow".into()))
}

#[async_trait]
impl Transact for PgStore {
    async fn commit(&self, batch: MutationBatch) -> Result<Committed> {
        let mut committed = Committed::default();
        if batch.is_empty() {
            return Ok(committed);
        }
        let mut tx = self.pool.begin().await.map_err(commit_err)?;

        for m in batch.products {
            match m {
                Mutation::Add(p) => {
                    let sql = format!(
                        "INSERT INTO products (name, description, price, picture_url, \
                         product_type, brand, quantity_in_stock, status, vendor_id, \
                         created_at, updated_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                         RETURNING {PRODUCT_COLS}"
                    );
                    let row: ProductRow = sqlx::query_as(&sql)
                        .bind(&p.name)
                        .bind(&p.description)
                        .bind(p.price)
                        .bind(&p.picture_url)
                        .bind(&p.product_type)
                        .bind(&p.brand)
                        .bind(quantity_i32(p.quantity_in_stock)?)
                        .bind(p.status.as_str())
                        .bind(&p.vendor_id)
                        .bind(p.created_at)
                        .bind(p.updated_at)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(commit_err)?;
                    committed.products.push(Product::try_from(row)?);
                }
                Mutation::Update(p) => {
                    let res = sqlx::query(
                        "UPDATE products SET name = $2, description = $3, price = $4, \
                         picture_url = $5, product_type = $6, brand = $7, \
                         quantity_in_stock = $8, status = $9, updated_at = $10 \
                         WHERE id = $1",
                    )
                    .bind(p.id)
                    .bind(&p.name)
                    .bind(&p.description)
                    .bind(p.price)
                    .bind(&p.picture_url)
                    .bind(&p.product_type)
                    .bind(&p.brand)
                    .bind(quantity_i32(p.quantity_in_stock)?)
                    .bind(p.status.as_str())
                    .bind(p.updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(commit_err)?;
                    if res.rows_affected() == 0 {
                        return Err(MarketError::Commit(format!("product {} does not exist", p.id)));
                    }
                }
                Mutation::Remove(p) => {
                    let res = sqlx::query("DELETE FROM products WHERE id = $1")
                        .bind(p.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(commit_err)?;
                    if res.rows_affected() == 0 {
                        return Err(MarketError::Commit(format!("product {} does not exist", p.id)));
                    }
                }
            }
        }

        for m in batch.orders {
            match m {
                Mutation::Add(o) => {
                    let sql = format!(
                        "INSERT INTO orders (buyer_email, delivery_name, delivery_price, \
                         items, subtotal, payment_intent_id, status, created_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                         RETURNING {}",
                        order_cols(true)
                    );
                    let row: OrderRow = sqlx::query_as(&sql)
                        .bind(&o.buyer_email)
                        .bind(&o.delivery.name)
                        .bind(o.delivery.price)
                        .bind(Json(&o.items))
                        .bind(o.subtotal)
                        .bind(&o.payment_intent_id)
                        .bind(o.status.as_str())
                        .bind(o.created_at)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(commit_err)?;
                    committed.orders.push(Order::try_from(row)?);
                }
                Mutation::Update(o) => {
                    let res = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
                        .bind(o.id)
                        .bind(o.status.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(commit_err)?;
                    if res.rows_affected() == 0 {
                        return Err(MarketError::Commit(format!("order {} does not exist", o.id)));
                    }
                }
                Mutation::Remove(o) => {
                    return Err(MarketError::Commit(format!(
                        "orders are never deleted (order {})",
                        o.id
                    )));
                }
            }
        }

        tx.commit().await.map_err(commit_err)?;
        Ok(committed)
    }
}
