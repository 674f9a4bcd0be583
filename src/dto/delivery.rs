use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{HelpdeskTicket, Order, Return};

pub const HELPDESK_REASONS: &[&str] = &[
    "Customer Not Available",
    "Wrong Address",
    "Payment Issue",
    "Package Damaged",
    "Vehicle Issue",
    "Other",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub new_status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteDeliveryRequest {
    pub otp: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitTicketRequest {
    pub reason: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplyTicketRequest {
    pub reply: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryStats {
    pub active_orders: i64,
    pub delivered_total: i64,
    pub delivered_this_month: i64,
    pub return_pickups: i64,
    pub monthly_salary: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryDashboard {
    pub stats: DeliveryStats,
    pub tasks: Vec<Order>,
    pub pickup_tasks: Vec<Return>,
    pub history: Vec<Order>,
    pub completed_pickups: Vec<Return>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketList {
    pub items: Vec<HelpdeskTicket>,
}
