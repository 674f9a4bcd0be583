use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, OrderList, OrderQuote, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, Coupon, Order, OrderItem, Payment},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::payment_service,
    state::AppState,
};

/// Coupon reserved for a customer's first order.
pub const FIRST_ORDER_COUPON: &str = "NEW50";

/// Order statuses a delivery partner walks an order through.
pub const ORDER_STATUSES: &[&str] = &["Pending", "Shipped", "On Way", "Delivered", "Cancelled"];

pub fn build_order_number() -> String {
    format!("SC-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase())
}

pub fn delivery_fee_for(subtotal: i64, fee: i64, free_threshold: i64) -> i64 {
    if subtotal >= free_threshold { 0 } else { fee }
}

/// Validate a coupon against the cart and compute its discount in paise.
///
/// `prior_orders` is the number of orders the user already placed; the
/// first-order coupon is rejected when it is non-zero.
pub fn coupon_discount(
    coupon: &Coupon,
    subtotal: i64,
    today: NaiveDate,
    prior_orders: i64,
) -> AppResult<i64> {
    if !coupon.is_active {
        return Err(AppError::BadRequest("Coupon is not active".into()));
    }
    if today < coupon.start_date || today > coupon.end_date {
        return Err(AppError::BadRequest("Coupon is not valid today".into()));
    }
    if subtotal < coupon.min_order_amount {
        return Err(AppError::BadRequest(format!(
            "Coupon requires a minimum order of {} paise",
            coupon.min_order_amount
        )));
    }
    if coupon.code == FIRST_ORDER_COUPON && prior_orders > 0 {
        return Err(AppError::BadRequest(
            "This coupon is only valid on your first order".into(),
        ));
    }

    let raw = match coupon.discount_type.as_str() {
        "Flat" => coupon.value,
        "Percent" => {
            let pct = subtotal.saturating_mul(coupon.value) / 100;
            match coupon.max_discount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown discount type {other}"
            )));
        }
    };

    Ok(raw.clamp(0, subtotal))
}

pub fn compute_quote(
    subtotal: i64,
    coupon: Option<&Coupon>,
    prior_orders: i64,
    today: NaiveDate,
    delivery_fee: i64,
    free_threshold: i64,
) -> AppResult<OrderQuote> {
    let discount_amount = match coupon {
        Some(c) => coupon_discount(c, subtotal, today, prior_orders)?,
        None => 0,
    };
    let fee = delivery_fee_for(subtotal, delivery_fee, free_threshold);
    Ok(OrderQuote {
        subtotal,
        delivery_fee: fee,
        discount_amount,
        total: subtotal - discount_amount + fee,
    })
}

/// Least-loaded active delivery partner: fewest orders currently in flight,
/// ties broken by user id for determinism.
pub async fn pick_delivery_partner(conn: &mut sqlx::PgConnection) -> AppResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT u.id
        FROM users u
        JOIN delivery_profiles dp ON dp.user_id = u.id AND dp.is_active
        LEFT JOIN orders o ON o.assigned_to = u.id AND o.status IN ('Pending', 'Shipped', 'On Way')
        WHERE u.role = 'Delivery' AND u.is_active
        GROUP BY u.id
        ORDER BY COUNT(o.id), u.id
        LIMIT 1
        "#,
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|(id,)| id))
}

#[derive(Debug, sqlx::FromRow)]
struct CartVariantRow {
    variant_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    price: i64,
    stock: i32,
    expiry_date: NaiveDate,
    product_name: String,
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let online = match payload.payment_method.as_str() {
        "COD" => false,
        "Online" => true,
        other => {
            return Err(AppError::BadRequest(format!(
                "Unknown payment method {other}"
            )));
        }
    };

    // Online orders must arrive with a verified gateway signature; reject
    // before touching the database.
    if online {
        let (gw_order, gw_payment, gw_signature) = match (
            payload.gateway_order_id.as_deref(),
            payload.gateway_payment_id.as_deref(),
            payload.gateway_signature.as_deref(),
        ) {
            (Some(o), Some(p), Some(s)) => (o, p, s),
            _ => {
                return Err(AppError::BadRequest(
                    "Missing gateway payment confirmation".into(),
                ));
            }
        };
        let secret = payment_service::gateway_secret()?;
        if !payment_service::verify_checkout_signature(&secret, gw_order, gw_payment, gw_signature)
        {
            return Err(AppError::Forbidden);
        }
    }

    let mut txn = state.pool.begin().await?;

    let rows: Vec<CartVariantRow> = sqlx::query_as(
        r#"
        SELECT ci.variant_id, pv.product_id, ci.quantity, pv.price, pv.stock,
               pv.expiry_date, p.name AS product_name
        FROM cart_items ci
        JOIN product_variants pv ON pv.id = ci.variant_id
        JOIN products p ON p.id = pv.product_id
        WHERE ci.user_id = $1
        FOR UPDATE OF ci, pv
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&mut *txn)
    .await?;

    if rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let today = Utc::now().date_naive();
    let mut subtotal: i64 = 0;
    for row in &rows {
        if row.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }
        if row.expiry_date < today {
            return Err(AppError::BadRequest(format!(
                "{} has expired and cannot be purchased",
                row.product_name
            )));
        }
        if row.stock < row.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                row.product_name
            )));
        }
        subtotal += row.price * i64::from(row.quantity);
    }

    let coupon: Option<Coupon> = match payload.coupon_code.as_deref() {
        Some(code) if !code.is_empty() => {
            let found: Option<Coupon> = sqlx::query_as("SELECT * FROM coupons WHERE code = $1")
                .bind(code)
                .fetch_optional(&mut *txn)
                .await?;
            match found {
                Some(c) => Some(c),
                None => return Err(AppError::BadRequest("Unknown coupon code".into())),
            }
        }
        _ => None,
    };

    let prior_orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&mut *txn)
        .await?;

    let quote = compute_quote(
        subtotal,
        coupon.as_ref(),
        prior_orders.0,
        today,
        state.config.delivery_fee,
        state.config.free_delivery_threshold,
    )?;

    let address: Option<Address> = match payload.address_id {
        Some(id) => {
            let addr: Option<Address> =
                sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user.user_id)
                    .fetch_optional(&mut *txn)
                    .await?;
            match addr {
                Some(a) => Some(a),
                None => return Err(AppError::BadRequest("Address not found".into())),
            }
        }
        None => None,
    };

    let assigned_to = pick_delivery_partner(&mut txn).await?;
    let order_number = build_order_number();
    let payment_status = if online { "Paid" } else { "Pending" };

    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, order_number, user_id, assigned_to, status, payment_status, payment_method,
            subtotal, delivery_fee, discount_amount, total_amount, coupon_code,
            full_name, email, phone, street_address, city, state, zip_code, gateway_order_id
        )
        VALUES ($1, $2, $3, $4, 'Pending', $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&order_number)
    .bind(user.user_id)
    .bind(assigned_to)
    .bind(payment_status)
    .bind(&payload.payment_method)
    .bind(quote.subtotal)
    .bind(quote.delivery_fee)
    .bind(quote.discount_amount)
    .bind(quote.total)
    .bind(coupon.as_ref().map(|c| c.code.clone()))
    .bind(&payload.full_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(address.as_ref().map(|a| a.street_address.clone()))
    .bind(address.as_ref().map(|a| a.city.clone()))
    .bind(address.as_ref().map(|a| a.state.clone()))
    .bind(address.as_ref().map(|a| a.zip_code.clone()))
    .bind(&payload.gateway_order_id)
    .fetch_one(&mut *txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(rows.len());
    for row in &rows {
        let item: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, product_id, variant_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(row.product_id)
        .bind(row.variant_id)
        .bind(row.quantity)
        .bind(row.price)
        .fetch_one(&mut *txn)
        .await?;
        items.push(item);

        sqlx::query("UPDATE product_variants SET stock = stock - $2 WHERE id = $1")
            .bind(row.variant_id)
            .bind(row.quantity)
            .execute(&mut *txn)
            .await?;
    }

    let payment: Payment = sqlx::query_as(
        r#"
        INSERT INTO payments (
            id, order_id, payment_method, amount, status,
            gateway_order_id, gateway_payment_id, gateway_signature, completed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order.id)
    .bind(&payload.payment_method)
    .bind(quote.total)
    .bind(if online { "Completed" } else { "Pending" })
    .bind(&payload.gateway_order_id)
    .bind(&payload.gateway_payment_id)
    .bind(&payload.gateway_signature)
    .bind(if online { Some(Utc::now()) } else { None })
    .fetch_one(&mut *txn)
    .await?;

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&mut *txn)
        .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "order_number": order.order_number,
            "total_amount": order.total_amount,
            "assigned_to": assigned_to,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order,
            items,
            payment: Some(payment),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let sort = query.sort_order.unwrap_or(SortOrder::Desc);

    let status = query.status.as_deref().filter(|s| !s.is_empty());

    let sql = format!(
        r#"
        SELECT * FROM orders
        WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
        ORDER BY created_at {}
        LIMIT $3 OFFSET $4
        "#,
        sort.as_sql()
    );
    let items: Vec<Order> = sqlx::query_as(&sql)
        .bind(user.user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(user.user_id)
    .bind(status)
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    load_order_details(state, order).await
}

/// Invoice lookup by the customer-facing order number.
pub async fn get_invoice(
    state: &AppState,
    user: &AuthUser,
    order_number: &str,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE order_number = $1 AND user_id = $2")
            .bind(order_number)
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    load_order_details(state, order).await
}

pub(crate) async fn load_order_details(
    state: &AppState,
    order: Order,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
        .bind(order.id)
        .fetch_all(&state.pool)
        .await?;

    let payment: Option<Payment> = sqlx::query_as(
        "SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(order.id)
    .fetch_optional(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order,
            items,
            payment,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn coupon(code: &str, discount_type: &str, value: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: code.to_string(),
            description: None,
            discount_type: discount_type.to_string(),
            value,
            min_order_amount: 0,
            max_discount: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            is_active: true,
        }
    }

    fn mid_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    #[test]
    fn delivery_fee_waived_at_threshold() {
        assert_eq!(delivery_fee_for(49_900, 5_000, 49_900), 0);
        assert_eq!(delivery_fee_for(49_899, 5_000, 49_900), 5_000);
    }

    #[test]
    fn flat_coupon_subtracts_value() {
        let c = coupon("SAVE10", "Flat", 1_000);
        assert_eq!(coupon_discount(&c, 30_000, mid_year(), 5).unwrap(), 1_000);
    }

    #[test]
    fn percent_coupon_respects_cap() {
        let mut c = coupon("PC20", "Percent", 20);
        assert_eq!(coupon_discount(&c, 50_000, mid_year(), 0).unwrap(), 10_000);

        c.max_discount = Some(5_000);
        assert_eq!(coupon_discount(&c, 50_000, mid_year(), 0).unwrap(), 5_000);
    }

    #[test]
    fn discount_never_exceeds_subtotal() {
        let c = coupon("BIG", "Flat", 100_000);
        assert_eq!(coupon_discount(&c, 20_000, mid_year(), 0).unwrap(), 20_000);
    }

    #[test]
    fn inactive_or_out_of_window_coupon_rejected() {
        let mut c = coupon("SAVE10", "Flat", 1_000);
        c.is_active = false;
        assert!(coupon_discount(&c, 30_000, mid_year(), 0).is_err());

        let c = coupon("SAVE10", "Flat", 1_000);
        let late = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert!(coupon_discount(&c, 30_000, late, 0).is_err());
    }

    #[test]
    fn min_order_amount_enforced() {
        let mut c = coupon("SAVE10", "Flat", 1_000);
        c.min_order_amount = 50_000;
        assert!(coupon_discount(&c, 30_000, mid_year(), 0).is_err());
        assert!(coupon_discount(&c, 50_000, mid_year(), 0).is_ok());
    }

    #[test]
    fn first_order_coupon_requires_no_history() {
        let c = coupon(FIRST_ORDER_COUPON, "Flat", 5_000);
        assert_eq!(coupon_discount(&c, 60_000, mid_year(), 0).unwrap(), 5_000);
        assert!(coupon_discount(&c, 60_000, mid_year(), 1).is_err());
    }

    #[test]
    fn quote_combines_fee_and_discount() {
        let c = coupon("SAVE10", "Flat", 1_000);
        let quote = compute_quote(30_000, Some(&c), 3, mid_year(), 5_000, 49_900).unwrap();
        assert_eq!(
            quote,
            OrderQuote {
                subtotal: 30_000,
                delivery_fee: 5_000,
                discount_amount: 1_000,
                total: 34_000,
            }
        );

        // Above the threshold the fee drops out.
        let quote = compute_quote(60_000, Some(&c), 3, mid_year(), 5_000, 49_900).unwrap();
        assert_eq!(quote.delivery_fee, 0);
        assert_eq!(quote.total, 59_000);
    }

    #[test]
    fn order_number_shape() {
        let n = build_order_number();
        assert!(n.starts_with("SC-"));
        assert_eq!(n.len(), 11);
    }
}
