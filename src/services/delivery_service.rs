use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::{
    audit,
    dto::delivery::{
        CompleteDeliveryRequest, DeliveryDashboard, DeliveryStats, HELPDESK_REASONS,
        SubmitTicketRequest, UpdateDeliveryStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_delivery},
    models::{DeliveryProfile, HelpdeskTicket, Order, Return},
    response::{ApiResponse, Meta},
    services::salary_service::month_bounds,
    state::AppState,
};

/// Delivery OTPs are single-use and expire after this many minutes.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Forward-only transitions a delivery partner may apply.
pub fn next_delivery_status(current: &str) -> Option<&'static str> {
    match current {
        "Pending" => Some("Shipped"),
        "Shipped" => Some("On Way"),
        "On Way" => Some("Delivered"),
        _ => None,
    }
}

pub fn generate_otp() -> String {
    format!("{}", rand::rng().random_range(100_000..=999_999))
}

pub fn otp_matches(
    stored: Option<&str>,
    created_at: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> bool {
    let (Some(stored), Some(created_at)) = (stored, created_at) else {
        return false;
    };
    if stored != submitted {
        return false;
    }
    now.signed_duration_since(created_at).num_minutes() < OTP_TTL_MINUTES
}

async fn assigned_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<Order> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND assigned_to = $2")
            .bind(order_id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    order.ok_or(AppError::NotFound)
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateDeliveryStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_delivery(user)?;
    let order = assigned_order(state, user, order_id).await?;

    if next_delivery_status(&order.status) != Some(payload.new_status.as_str()) {
        return Err(AppError::BadRequest("Invalid status change".into()));
    }

    let order = apply_status(state, &order, &payload.new_status).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "delivery_status",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await;

    Ok(ApiResponse::success("Status updated", order, None))
}

async fn apply_status(state: &AppState, order: &Order, new_status: &str) -> AppResult<Order> {
    let delivered = new_status == "Delivered";
    let cod_paid = delivered && order.payment_method == "COD" && order.payment_status != "Paid";

    let order: Order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $2,
            delivered_at = CASE WHEN $3 THEN now() ELSE delivered_at END,
            payment_status = CASE WHEN $4 THEN 'Paid' ELSE payment_status END,
            delivery_otp = CASE WHEN $3 THEN NULL ELSE delivery_otp END,
            otp_created_at = CASE WHEN $3 THEN NULL ELSE otp_created_at END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(new_status)
    .bind(delivered)
    .bind(cod_paid)
    .fetch_one(&state.pool)
    .await?;

    if cod_paid {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'Completed', completed_at = now(), updated_at = now()
            WHERE order_id = $1 AND status = 'Pending'
            "#,
        )
        .bind(order.id)
        .execute(&state.pool)
        .await?;
    }

    Ok(order)
}

/// Issue a fresh delivery OTP for an assigned order. Delivering the code to
/// the customer (mail/SMS) is an external concern; it is only logged here.
pub async fn send_otp(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_delivery(user)?;
    let order = assigned_order(state, user, order_id).await?;

    if order.status == "Delivered" || order.status == "Cancelled" {
        return Err(AppError::BadRequest(
            "Order is not awaiting delivery".into(),
        ));
    }

    let otp = generate_otp();
    sqlx::query("UPDATE orders SET delivery_otp = $2, otp_created_at = now(), updated_at = now() WHERE id = $1")
        .bind(order.id)
        .bind(&otp)
        .execute(&state.pool)
        .await?;

    tracing::info!(order_number = %order.order_number, otp, "delivery OTP issued");

    Ok(ApiResponse::ack("OTP sent"))
}

pub async fn complete_delivery(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: CompleteDeliveryRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_delivery(user)?;
    let order = assigned_order(state, user, order_id).await?;

    if order.status == "Delivered" {
        return Err(AppError::BadRequest("Order already delivered".into()));
    }

    if !otp_matches(
        order.delivery_otp.as_deref(),
        order.otp_created_at,
        payload.otp.trim(),
        Utc::now(),
    ) {
        return Err(AppError::BadRequest("Invalid OTP".into()));
    }

    let order = apply_status(state, &order, "Delivered").await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "delivery_complete",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await;

    Ok(ApiResponse::success("Delivery completed", order, None))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DeliveryDashboard>> {
    ensure_delivery(user)?;

    let tasks: Vec<Order> = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE assigned_to = $1 AND status IN ('Pending', 'Shipped', 'On Way')
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let history: Vec<Order> = sqlx::query_as(
        "SELECT * FROM orders WHERE assigned_to = $1 AND status = 'Delivered' ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let pickup_tasks: Vec<Return> = sqlx::query_as(
        "SELECT * FROM returns WHERE assigned_to = $1 AND status = 'Approved' ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let completed_pickups: Vec<Return> = sqlx::query_as(
        "SELECT * FROM returns WHERE assigned_to = $1 AND status = 'Completed' ORDER BY picked_up_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let now = Utc::now();
    let (month_start, month_end) = month_bounds(now.year(), now.month())
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid current month")))?;

    let delivered_this_month: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE assigned_to = $1 AND status = 'Delivered'
          AND delivered_at >= $2 AND delivered_at < $3
        "#,
    )
    .bind(user.user_id)
    .bind(month_start)
    .bind(month_end)
    .fetch_one(&state.pool)
    .await?;

    let profile: Option<DeliveryProfile> =
        sqlx::query_as("SELECT * FROM delivery_profiles WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;

    let stats = DeliveryStats {
        active_orders: tasks.len() as i64,
        delivered_total: history.len() as i64,
        delivered_this_month: delivered_this_month.0,
        return_pickups: pickup_tasks.len() as i64,
        monthly_salary: profile.map(|p| p.base_salary).unwrap_or(0),
    };

    Ok(ApiResponse::success(
        "OK",
        DeliveryDashboard {
            stats,
            tasks,
            pickup_tasks,
            history,
            completed_pickups,
        },
        Some(Meta::empty()),
    ))
}

pub async fn submit_ticket(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitTicketRequest,
) -> AppResult<ApiResponse<HelpdeskTicket>> {
    ensure_delivery(user)?;

    if !HELPDESK_REASONS.contains(&payload.reason.as_str()) {
        return Err(AppError::BadRequest("Please select a valid reason".into()));
    }

    let ticket: HelpdeskTicket = sqlx::query_as(
        r#"
        INSERT INTO helpdesk_tickets (id, user_id, reason, remarks)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(&payload.reason)
    .bind(payload.remarks.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Ticket submitted", ticket, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_machine_is_forward_only() {
        assert_eq!(next_delivery_status("Pending"), Some("Shipped"));
        assert_eq!(next_delivery_status("Shipped"), Some("On Way"));
        assert_eq!(next_delivery_status("On Way"), Some("Delivered"));
        assert_eq!(next_delivery_status("Delivered"), None);
        assert_eq!(next_delivery_status("Cancelled"), None);
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..32 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn otp_validation_checks_value_and_age() {
        let now = Utc::now();
        let fresh = Some(now - Duration::minutes(5));
        let stale = Some(now - Duration::minutes(11));

        assert!(otp_matches(Some("123456"), fresh, "123456", now));
        assert!(!otp_matches(Some("123456"), fresh, "654321", now));
        assert!(!otp_matches(Some("123456"), stale, "123456", now));
        assert!(!otp_matches(None, fresh, "123456", now));
        assert!(!otp_matches(Some("123456"), None, "123456", now));
    }
}
