use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, Payment};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// "COD" or "Online".
    pub payment_method: String,
    pub address_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub coupon_code: Option<String>,
    /// Present only for online payments, as returned by the gateway checkout.
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Price breakdown computed at checkout time.
#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderQuote {
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub discount_amount: i64,
    pub total: i64,
}
