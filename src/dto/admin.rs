use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Coupon, Order, Payment, Return};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub total_customers: i64,
    pub total_products: i64,
    pub total_payments: i64,
    pub total_returns: i64,
    pub pending_returns: i64,
    pub open_tickets: i64,
    /// Sum of completed payments, in paise.
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct LowStockRow {
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_value: i32,
    pub unit_type: String,
    pub batch_number: String,
    pub stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub stats: DashboardStats,
    pub recent_orders: Vec<Order>,
    pub recent_payments: Vec<Payment>,
    pub recent_returns: Vec<Return>,
    pub low_stock: Vec<LowStockRow>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub code: String,
    pub description: Option<String>,
    /// "Flat" or "Percent".
    pub discount_type: String,
    pub value: i64,
    #[serde(default)]
    pub min_order_amount: i64,
    pub max_discount: Option<i64>,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub description: Option<String>,
    pub value: Option<i64>,
    pub min_order_amount: Option<i64>,
    pub max_discount: Option<i64>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}
