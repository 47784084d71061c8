//! Domain entities and their state machines.

pub mod order;
pub mod product;

pub use order::{Delivery, Order, OrderId, OrderItem, OrderStatus};
pub use product::{Product, ProductDraft, ProductId, ProductStatus};
