use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    error::{AppError, AppResult},
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(gateway_webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw gateway event payload, verified against the signature header"),
    responses(
        (status = 200, description = "Webhook accepted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing signature or malformed body"),
        (status = 403, description = "Signature verification failed"),
    ),
    tag = "Payments"
)]
pub async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".into()))?;

    let secret = payment_service::gateway_secret()?;
    if !payment_service::verify_webhook_signature(&secret, &body, signature) {
        return Err(AppError::Forbidden);
    }

    let resp = payment_service::apply_webhook_event(&state, &body).await?;
    Ok(Json(resp))
}
