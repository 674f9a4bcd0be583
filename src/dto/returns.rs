use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Refund, Return};

pub const RETURN_REASONS: &[&str] = &[
    "Damaged",
    "Wrong Item",
    "Not as Described",
    "Quality Issue",
    "Expired",
    "Missing Items",
    "Changed Mind",
    "Other",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReturnRequest {
    pub order_id: Uuid,
    pub reason: String,
    pub issue: String,
    pub additional_details: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnDecisionRequest {
    /// "Approved" or "Rejected".
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmPickupRequest {
    /// Deduction (paise) for damage found at pickup, subtracted from the refund.
    #[serde(default)]
    pub damage_amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRefundRequest {
    /// "Processed" or "Failed".
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnWithRefund {
    pub return_request: Return,
    pub refund: Option<Refund>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnList {
    pub items: Vec<Return>,
}
