use uuid::Uuid;

use crate::{
    audit,
    dto::returns::{
        ConfirmPickupRequest, ProcessRefundRequest, RETURN_REASONS, ReturnDecisionRequest,
        ReturnList, ReturnWithRefund, SubmitReturnRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_delivery},
    models::{Order, Refund, Return, roles},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Pick the active partner with the lightest combined load of live
/// deliveries and pending return pickups. Ties break on id for a stable
/// choice.
async fn pick_pickup_partner(conn: &mut sqlx::PgConnection) -> AppResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT u.id
        FROM users u
        JOIN delivery_profiles dp ON dp.user_id = u.id AND dp.is_active
        LEFT JOIN orders o
            ON o.assigned_to = u.id AND o.status IN ('Pending', 'Shipped', 'On Way')
        LEFT JOIN returns r
            ON r.assigned_to = u.id AND r.status = 'Approved'
        WHERE u.is_active AND u.role = 'Delivery'
        GROUP BY u.id
        ORDER BY COUNT(DISTINCT o.id) + COUNT(DISTINCT r.id), u.id
        LIMIT 1
        "#,
    )
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn submit_return(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitReturnRequest,
) -> AppResult<ApiResponse<Return>> {
    if !RETURN_REASONS.contains(&payload.reason.as_str()) {
        return Err(AppError::BadRequest("Please select a valid reason".into()));
    }
    if payload.issue.trim().is_empty() {
        return Err(AppError::BadRequest("Please describe the issue".into()));
    }

    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(payload.order_id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let order = order.ok_or(AppError::NotFound)?;

    if order.status != "Delivered" {
        return Err(AppError::BadRequest(
            "Only delivered orders can be returned".into(),
        ));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM returns WHERE order_id = $1")
        .bind(order.id)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(
            "A return already exists for this order".into(),
        ));
    }

    let request: Return = sqlx::query_as(
        r#"
        INSERT INTO returns (id, order_id, user_id, reason, issue, additional_details)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order.id)
    .bind(user.user_id)
    .bind(&payload.reason)
    .bind(payload.issue.trim())
    .bind(payload.additional_details.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "return_submit",
        Some("returns"),
        Some(serde_json::json!({ "return_id": request.id, "order_id": order.id })),
    )
    .await;

    Ok(ApiResponse::success("Return submitted", request, None))
}

pub async fn list_my_returns(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReturnList>> {
    let items: Vec<Return> =
        sqlx::query_as("SELECT * FROM returns WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        ReturnList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_return(
    state: &AppState,
    user: &AuthUser,
    return_id: Uuid,
) -> AppResult<ApiResponse<ReturnWithRefund>> {
    let request: Option<Return> = sqlx::query_as("SELECT * FROM returns WHERE id = $1")
        .bind(return_id)
        .fetch_optional(&state.pool)
        .await?;
    let request = request.ok_or(AppError::NotFound)?;

    if user.role != roles::ADMIN && request.user_id != user.user_id {
        return Err(AppError::NotFound);
    }

    let refund: Option<Refund> = sqlx::query_as("SELECT * FROM refunds WHERE return_id = $1")
        .bind(request.id)
        .fetch_optional(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        ReturnWithRefund {
            return_request: request,
            refund,
        },
        None,
    ))
}

pub async fn list_all_returns(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReturnList>> {
    ensure_admin(user)?;

    let items: Vec<Return> = sqlx::query_as("SELECT * FROM returns ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        ReturnList { items },
        Some(Meta::empty()),
    ))
}

/// Admin approves or rejects a freshly submitted return. Approval also
/// assigns the pickup to a partner so it shows up on their dashboard.
pub async fn decide_return(
    state: &AppState,
    user: &AuthUser,
    return_id: Uuid,
    payload: ReturnDecisionRequest,
) -> AppResult<ApiResponse<Return>> {
    ensure_admin(user)?;

    if payload.status != "Approved" && payload.status != "Rejected" {
        return Err(AppError::BadRequest(
            "Status must be Approved or Rejected".into(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    let request: Option<Return> = sqlx::query_as("SELECT * FROM returns WHERE id = $1 FOR UPDATE")
        .bind(return_id)
        .fetch_optional(&mut *tx)
        .await?;
    let request = request.ok_or(AppError::NotFound)?;

    if request.status != "Initiated" {
        return Err(AppError::BadRequest(
            "Return has already been decided".into(),
        ));
    }

    let assigned_to = if payload.status == "Approved" {
        pick_pickup_partner(&mut tx).await?
    } else {
        None
    };

    let request: Return = sqlx::query_as(
        r#"
        UPDATE returns
        SET status = $2, assigned_to = $3, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(request.id)
    .bind(&payload.status)
    .bind(assigned_to)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "return_decision",
        Some("returns"),
        Some(serde_json::json!({
            "return_id": request.id,
            "status": request.status,
            "assigned_to": request.assigned_to,
        })),
    )
    .await;

    Ok(ApiResponse::success("Return updated", request, None))
}

/// Delivery partner confirms the item is back in hand. Completes the
/// return and opens a refund for the order total minus any damage found
/// at pickup.
pub async fn confirm_pickup(
    state: &AppState,
    user: &AuthUser,
    return_id: Uuid,
    payload: ConfirmPickupRequest,
) -> AppResult<ApiResponse<ReturnWithRefund>> {
    ensure_delivery(user)?;

    if payload.damage_amount < 0 {
        return Err(AppError::BadRequest("Damage amount cannot be negative".into()));
    }

    let mut tx = state.pool.begin().await?;

    let request: Option<Return> = sqlx::query_as(
        "SELECT * FROM returns WHERE id = $1 AND assigned_to = $2 FOR UPDATE",
    )
    .bind(return_id)
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?;
    let request = request.ok_or(AppError::NotFound)?;

    if request.status != "Approved" {
        return Err(AppError::BadRequest(
            "Return is not awaiting pickup".into(),
        ));
    }

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(request.order_id)
        .fetch_one(&mut *tx)
        .await?;

    let request: Return = sqlx::query_as(
        r#"
        UPDATE returns
        SET status = 'Completed', picked_up_at = now(), updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(request.id)
    .fetch_one(&mut *tx)
    .await?;

    let amount = (order.total_amount - payload.damage_amount).max(0);
    let refund: Refund = sqlx::query_as(
        r#"
        INSERT INTO refunds (id, order_id, return_id, amount, damage_amount)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order.id)
    .bind(request.id)
    .bind(amount)
    .bind(payload.damage_amount)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "return_pickup",
        Some("returns"),
        Some(serde_json::json!({
            "return_id": request.id,
            "refund_number": refund.refund_number,
            "amount": refund.amount,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Pickup confirmed",
        ReturnWithRefund {
            return_request: request,
            refund: Some(refund),
        },
        None,
    ))
}

pub async fn process_refund(
    state: &AppState,
    user: &AuthUser,
    refund_id: Uuid,
    payload: ProcessRefundRequest,
) -> AppResult<ApiResponse<Refund>> {
    ensure_admin(user)?;

    if payload.status != "Processed" && payload.status != "Failed" {
        return Err(AppError::BadRequest(
            "Status must be Processed or Failed".into(),
        ));
    }

    let refund: Option<Refund> = sqlx::query_as(
        r#"
        UPDATE refunds
        SET status = $2, notes = $3, processed_by = $4, processed_at = now()
        WHERE id = $1 AND status = 'Pending'
        RETURNING *
        "#,
    )
    .bind(refund_id)
    .bind(&payload.status)
    .bind(payload.notes.as_deref().map(str::trim))
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    let refund = refund.ok_or_else(|| {
        AppError::BadRequest("Only a Pending refund can be processed".into())
    })?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "refund_processed",
        Some("refunds"),
        Some(serde_json::json!({
            "refund_id": refund.id,
            "refund_number": refund.refund_number,
            "status": refund.status,
        })),
    )
    .await;

    Ok(ApiResponse::success("Refund updated", refund, None))
}

pub async fn list_refunds(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<Refund>>> {
    ensure_admin(user)?;

    let items: Vec<Refund> = sqlx::query_as("SELECT * FROM refunds ORDER BY created_at DESC")
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success("OK", items, Some(Meta::empty())))
}
