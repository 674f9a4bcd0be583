use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::SalaryPayment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSalaryRequest {
    pub partner_id: Uuid,
    pub month: i32,
    pub year: i32,
    #[serde(default)]
    pub bonus: i64,
    #[serde(default)]
    pub deductions: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaySalaryRequest {
    /// "Bank Transfer" or "UPI".
    pub payment_mode: String,
    pub transaction_reference: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSalaryStatusRequest {
    /// "Hold" or "Cancelled".
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalaryList {
    pub items: Vec<SalaryPayment>,
}
