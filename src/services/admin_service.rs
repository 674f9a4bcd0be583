use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            AdminDashboard, CouponList, CreateCouponRequest, DashboardStats, LowStockRow,
            UpdateCouponRequest, UpdateOrderStatusRequest,
        },
        delivery::{ReplyTicketRequest, TicketList},
        orders::{OrderList, OrderWithItems},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Coupon, HelpdeskTicket, Order, OrderItem, Payment, Return},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{self, ORDER_STATUSES},
    state::AppState,
};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminDashboard>> {
    ensure_admin(user)?;

    #[derive(sqlx::FromRow)]
    struct StatsRow {
        total_orders: i64,
        pending_orders: i64,
        delivered_orders: i64,
        cancelled_orders: i64,
        total_customers: i64,
        total_products: i64,
        total_payments: i64,
        total_returns: i64,
        pending_returns: i64,
        open_tickets: i64,
        revenue: Option<i64>,
    }

    let row: StatsRow = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM orders) AS total_orders,
            (SELECT COUNT(*) FROM orders WHERE status = 'Pending') AS pending_orders,
            (SELECT COUNT(*) FROM orders WHERE status = 'Delivered') AS delivered_orders,
            (SELECT COUNT(*) FROM orders WHERE status = 'Cancelled') AS cancelled_orders,
            (SELECT COUNT(*) FROM users WHERE role = 'Customer') AS total_customers,
            (SELECT COUNT(*) FROM products WHERE is_active) AS total_products,
            (SELECT COUNT(*) FROM payments) AS total_payments,
            (SELECT COUNT(*) FROM returns) AS total_returns,
            (SELECT COUNT(*) FROM returns WHERE status = 'Initiated') AS pending_returns,
            (SELECT COUNT(*) FROM helpdesk_tickets WHERE status = 'Open') AS open_tickets,
            (SELECT SUM(amount) FROM payments WHERE status = 'Completed') AS revenue
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let recent_orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT 10")
            .fetch_all(&state.pool)
            .await?;

    let recent_payments: Vec<Payment> =
        sqlx::query_as("SELECT * FROM payments ORDER BY created_at DESC LIMIT 10")
            .fetch_all(&state.pool)
            .await?;

    let recent_returns: Vec<Return> =
        sqlx::query_as("SELECT * FROM returns ORDER BY created_at DESC LIMIT 10")
            .fetch_all(&state.pool)
            .await?;

    let low_stock = low_stock_rows(state, DEFAULT_LOW_STOCK_THRESHOLD).await?;

    let stats = DashboardStats {
        total_orders: row.total_orders,
        pending_orders: row.pending_orders,
        delivered_orders: row.delivered_orders,
        cancelled_orders: row.cancelled_orders,
        total_customers: row.total_customers,
        total_products: row.total_products,
        total_payments: row.total_payments,
        total_returns: row.total_returns,
        pending_returns: row.pending_returns,
        open_tickets: row.open_tickets,
        revenue: row.revenue.unwrap_or(0),
    };

    Ok(ApiResponse::success(
        "OK",
        AdminDashboard {
            stats,
            recent_orders,
            recent_payments,
            recent_returns,
            low_stock,
        },
        Some(Meta::empty()),
    ))
}

async fn low_stock_rows(state: &AppState, threshold: i32) -> AppResult<Vec<LowStockRow>> {
    let rows: Vec<LowStockRow> = sqlx::query_as(
        r#"
        SELECT pv.id AS variant_id, p.id AS product_id, p.name AS product_name,
               pv.unit_value, pv.unit_type, pv.batch_number, pv.stock
        FROM product_variants pv
        JOIN products p ON p.id = pv.product_id
        WHERE p.is_active AND pv.stock <= $1
        ORDER BY pv.stock, p.name
        "#,
    )
    .bind(threshold)
    .fetch_all(&state.pool)
    .await?;
    Ok(rows)
}

pub async fn low_stock(
    state: &AppState,
    user: &AuthUser,
    threshold: Option<i32>,
) -> AppResult<ApiResponse<Vec<LowStockRow>>> {
    ensure_admin(user)?;
    let rows = low_stock_rows(state, threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)).await?;
    Ok(ApiResponse::success("OK", rows, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let (page, limit, offset) = query.pagination.normalize();
    let sort = query.sort_order.unwrap_or(SortOrder::Desc);
    let status = query.status.as_deref().filter(|s| !s.is_empty());

    let sql = format!(
        r#"
        SELECT * FROM orders
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY created_at {}
        LIMIT $2 OFFSET $3
        "#,
        sort.as_sql()
    );
    let items: Vec<Order> = sqlx::query_as(&sql)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::TEXT IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&state.pool)
        .await?;
    let order = order.ok_or(AppError::NotFound)?;

    order_service::load_order_details(state, order).await
}

/// Admin override of the order status. Cancellation only works while the
/// order is still Pending and puts the reserved stock back.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    if !ORDER_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest("Unknown order status".into()));
    }

    let mut tx = state.pool.begin().await?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    let order = order.ok_or(AppError::NotFound)?;

    if order.status == "Delivered" || order.status == "Cancelled" {
        return Err(AppError::BadRequest(format!(
            "Order is already {}",
            order.status
        )));
    }

    let cancelling = payload.status == "Cancelled";
    if cancelling && order.status != "Pending" {
        return Err(AppError::BadRequest(
            "Only a Pending order can be cancelled".into(),
        ));
    }

    if cancelling {
        let items: Vec<OrderItem> =
            sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
                .bind(order.id)
                .fetch_all(&mut *tx)
                .await?;
        for item in &items {
            if let Some(variant_id) = item.variant_id {
                sqlx::query("UPDATE product_variants SET stock = stock + $2 WHERE id = $1")
                    .bind(variant_id)
                    .bind(item.quantity)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        sqlx::query(
            "UPDATE payments SET status = 'Failed', updated_at = now() WHERE order_id = $1 AND status = 'Pending'",
        )
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    }

    let delivered = payload.status == "Delivered";
    let cod_paid = delivered && order.payment_method == "COD" && order.payment_status != "Paid";

    let order: Order = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $2,
            delivered_at = CASE WHEN $3 THEN now() ELSE delivered_at END,
            payment_status = CASE WHEN $4 THEN 'Paid' ELSE payment_status END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(&payload.status)
    .bind(delivered)
    .bind(cod_paid)
    .fetch_one(&mut *tx)
    .await?;

    if cod_paid {
        sqlx::query(
            "UPDATE payments SET status = 'Completed', completed_at = now(), updated_at = now() WHERE order_id = $1 AND status = 'Pending'",
        )
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_admin",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await;

    Ok(ApiResponse::success("Order updated", order, None))
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;

    let code = payload.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::BadRequest("Coupon code is required".into()));
    }
    match payload.discount_type.as_str() {
        "Flat" => {
            if payload.value <= 0 {
                return Err(AppError::BadRequest("Flat value must be positive".into()));
            }
        }
        "Percent" => {
            if !(1..=100).contains(&payload.value) {
                return Err(AppError::BadRequest(
                    "Percent value must be between 1 and 100".into(),
                ));
            }
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown discount type {other}"
            )));
        }
    }
    if payload.end_date < payload.start_date {
        return Err(AppError::BadRequest("End date precedes start date".into()));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM coupons WHERE code = $1")
        .bind(&code)
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Coupon code already exists".into()));
    }

    let coupon: Coupon = sqlx::query_as(
        r#"
        INSERT INTO coupons
            (id, code, description, discount_type, value, min_order_amount, max_discount,
             start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(payload.description.as_deref().map(str::trim))
    .bind(&payload.discount_type)
    .bind(payload.value)
    .bind(payload.min_order_amount)
    .bind(payload.max_discount)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Coupon created", coupon, None))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    coupon_id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;

    let coupon: Option<Coupon> = sqlx::query_as(
        r#"
        UPDATE coupons
        SET description = COALESCE($2, description),
            value = COALESCE($3, value),
            min_order_amount = COALESCE($4, min_order_amount),
            max_discount = COALESCE($5, max_discount),
            start_date = COALESCE($6, start_date),
            end_date = COALESCE($7, end_date),
            is_active = COALESCE($8, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(coupon_id)
    .bind(payload.description.as_deref().map(str::trim))
    .bind(payload.value)
    .bind(payload.min_order_amount)
    .bind(payload.max_discount)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_active)
    .fetch_optional(&state.pool)
    .await?;

    let coupon = coupon.ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Coupon updated", coupon, None))
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;

    let items: Vec<Coupon> =
        sqlx::query_as("SELECT * FROM coupons ORDER BY start_date DESC, code")
            .fetch_all(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        CouponList { items },
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    coupon_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
        .bind(coupon_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::ack("Coupon deleted"))
}

pub async fn list_tickets(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<TicketList>> {
    ensure_admin(user)?;

    let items: Vec<HelpdeskTicket> = sqlx::query_as(
        "SELECT * FROM helpdesk_tickets ORDER BY status DESC, created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        TicketList { items },
        Some(Meta::empty()),
    ))
}

pub async fn reply_ticket(
    state: &AppState,
    user: &AuthUser,
    ticket_id: Uuid,
    payload: ReplyTicketRequest,
) -> AppResult<ApiResponse<HelpdeskTicket>> {
    ensure_admin(user)?;

    let reply = payload.reply.trim();
    if reply.is_empty() {
        return Err(AppError::BadRequest("Reply cannot be empty".into()));
    }

    let ticket: Option<HelpdeskTicket> = sqlx::query_as(
        r#"
        UPDATE helpdesk_tickets
        SET admin_reply = $2, replied_by = $3, replied_at = now(), status = 'Resolved'
        WHERE id = $1 AND status = 'Open'
        RETURNING *
        "#,
    )
    .bind(ticket_id)
    .bind(reply)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    let ticket =
        ticket.ok_or_else(|| AppError::BadRequest("Ticket is not open".into()))?;

    Ok(ApiResponse::success("Reply sent", ticket, None))
}
