//! Order Aggregate
//!
//! Orders arrive from checkout already carrying a payment-intent id. The core
//! only ever moves them from PaymentReceived to Refunded; nothing deletes them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::ProductId;

pub type OrderId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_email: String,
    pub delivery: Delivery,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub payment_intent_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Shipping selection snapshotted onto the order at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub name: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub picture_url: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// No payment captured yet.
    #[default]
    Pending,
    /// Payment captured, not refunded. The only state a refund may start from.
    PaymentReceived,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentReceived => "payment_received",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "payment_received" => Some(Self::PaymentReceived),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl Order {
    /// Order total as charged: line subtotal plus the delivery price.
    pub fn total(&self) -> Decimal {
        self.subtotal + self.delivery.price
    }

    pub fn is_refundable(&self) -> bool {
        self.status == OrderStatus::PaymentReceived
    }
}
