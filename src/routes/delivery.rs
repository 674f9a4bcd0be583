use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        delivery::{
            CompleteDeliveryRequest, DeliveryDashboard, SubmitTicketRequest,
            UpdateDeliveryStatusRequest,
        },
        returns::{ConfirmPickupRequest, ReturnWithRefund},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{HelpdeskTicket, Order},
    response::ApiResponse,
    services::{delivery_service, return_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/orders/{id}/status", put(update_status))
        .route("/orders/{id}/otp", post(send_otp))
        .route("/orders/{id}/complete", post(complete_delivery))
        .route("/returns/{id}/pickup", post(confirm_pickup))
        .route("/helpdesk", post(submit_ticket))
}

#[utoipa::path(
    get,
    path = "/api/delivery/dashboard",
    responses(
        (status = 200, description = "Partner workload, history and salary summary", body = ApiResponse<DeliveryDashboard>),
        (status = 403, description = "Not a delivery partner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeliveryDashboard>>> {
    let resp = delivery_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/delivery/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Advance an assigned order one step", body = ApiResponse<Order>),
        (status = 400, description = "Invalid status change"),
        (status = 404, description = "Order not assigned to this partner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = delivery_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/orders/{id}/otp",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Issue a delivery OTP to the customer", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Order not assigned to this partner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn send_otp(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = delivery_service::send_otp(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CompleteDeliveryRequest,
    responses(
        (status = 200, description = "Complete delivery with the customer's OTP", body = ApiResponse<Order>),
        (status = 400, description = "Invalid or expired OTP"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn complete_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteDeliveryRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = delivery_service::complete_delivery(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/returns/{id}/pickup",
    params(("id" = Uuid, Path, description = "Return id")),
    request_body = ConfirmPickupRequest,
    responses(
        (status = 200, description = "Confirm the pickup and open a refund", body = ApiResponse<ReturnWithRefund>),
        (status = 400, description = "Return is not awaiting pickup"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn confirm_pickup(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPickupRequest>,
) -> AppResult<Json<ApiResponse<ReturnWithRefund>>> {
    let resp = return_service::confirm_pickup(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/helpdesk",
    request_body = SubmitTicketRequest,
    responses(
        (status = 200, description = "Raise a helpdesk ticket", body = ApiResponse<HelpdeskTicket>),
        (status = 400, description = "Invalid reason"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn submit_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitTicketRequest>,
) -> AppResult<Json<ApiResponse<HelpdeskTicket>>> {
    let resp = delivery_service::submit_ticket(&state, &user, payload).await?;
    Ok(Json(resp))
}
