//! Operation layer: one service per surface, each parameterized by an
//! explicit caller scope instead of branching on ambient identity.

pub mod dashboard;
pub mod orders;
pub mod products;

pub use dashboard::{AdminSummary, DashboardService, StatusCounts, VendorSummary};
pub use orders::OrderService;
pub use products::ProductService;
