use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub variant_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Cart line joined with its variant and product for display.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_value: i32,
    pub unit_type: String,
    pub price: i64,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub subtotal: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ToggleWishlistRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub thumbnail_path: Option<String>,
    pub variant_id: Option<Uuid>,
    pub price: Option<i64>,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistList {
    pub items: Vec<WishlistEntry>,
}
