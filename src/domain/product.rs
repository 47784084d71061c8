//! Product Aggregate
//!
//! Vendor-submitted products go through moderation (Pending until an admin
//! approves them); catalog-seeded products have no owner and start Approved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type ProductId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub picture_url: String,
    pub product_type: String,
    pub brand: String,
    pub quantity_in_stock: u32,
    pub status: ProductStatus,
    /// Absent for catalog-owned products; present for vendor submissions.
    pub vendor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
    Suspended,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 4] = [
        ProductStatus::Pending,
        ProductStatus::Approved,
        ProductStatus::Rejected,
        ProductStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// The field set a vendor may supply. Status and ownership are never part of
/// it, so a caller cannot smuggle either past the moderation rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub picture_url: String,
    pub product_type: String,
    pub brand: String,
    pub quantity_in_stock: u32,
}

impl Product {
    /// New vendor submission: always Pending, owner stamped from the caller.
    pub fn submit(draft: ProductDraft, vendor_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // assigned by the store on commit
            name: draft.name,
            description: draft.description,
            price: draft.price,
            picture_url: draft.picture_url,
            product_type: draft.product_type,
            brand: draft.brand,
            quantity_in_stock: draft.quantity_in_stock,
            status: ProductStatus::Pending,
            vendor_id: Some(vendor_id.into()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Approved products are frozen for vendors; a changed product must go
    /// back through review as a new submission.
    pub fn is_editable(&self) -> bool {
        self.status != ProductStatus::Approved
    }

    /// Overwrite the mutable fields and reset to Pending for re-review.
    pub fn apply_draft(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.picture_url = draft.picture_url;
        self.product_type = draft.product_type;
        self.brand = draft.brand;
        self.quantity_in_stock = draft.quantity_in_stock;
        self.status = ProductStatus::Pending;
        self.touch();
    }

    pub fn set_status(&mut self, status: ProductStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
