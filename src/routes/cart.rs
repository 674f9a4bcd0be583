use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartLine, CartView, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, ProductVariant},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart).delete(clear_cart))
        .route("/{id}", axum::routing::put(update_cart_item).delete(remove_from_cart))
}

async fn load_cart(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let items: Vec<CartLine> = sqlx::query_as(
        r#"
        SELECT ci.id, ci.variant_id, pv.product_id, p.name AS product_name,
               pv.unit_value, pv.unit_type, pv.price, ci.quantity
        FROM cart_items ci
        JOIN product_variants pv ON pv.id = ci.variant_id
        JOIN products p ON p.id = pv.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let subtotal = items.iter().map(CartLine::line_total).sum();
    Ok(CartView { items, subtotal })
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart contents with subtotal", body = ApiResponse<CartView>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let cart = load_cart(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("OK", cart, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add a variant to the cart, summing quantities", body = ApiResponse<CartItem>),
        (status = 400, description = "Bad request"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let variant: Option<ProductVariant> = sqlx::query_as(
        r#"
        SELECT pv.* FROM product_variants pv
        JOIN products p ON p.id = pv.product_id
        WHERE pv.id = $1 AND p.is_active
        "#,
    )
    .bind(payload.variant_id)
    .fetch_optional(&state.pool)
    .await?;
    let variant = variant.ok_or_else(|| AppError::BadRequest("variant not found".to_string()))?;

    if variant.is_expired(Utc::now().date_naive()) {
        return Err(AppError::BadRequest("This batch has expired".into()));
    }

    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 AND variant_id = $2")
            .bind(user.user_id)
            .bind(payload.variant_id)
            .fetch_optional(&state.pool)
            .await?;

    let requested = existing.as_ref().map_or(0, |i| i.quantity) + payload.quantity;
    if requested > variant.stock {
        return Err(AppError::BadRequest(format!(
            "Only {} left in stock",
            variant.stock
        )));
    }

    let item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, variant_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, variant_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.variant_id)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success("Added to cart", item, None)))
}

#[utoipa::path(
    put,
    path = "/api/cart/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Set a cart line quantity; zero removes the line", body = ApiResponse<CartView>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    if payload.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_string(),
        ));
    }

    let stock: Option<(i32,)> = sqlx::query_as(
        r#"
        SELECT pv.stock FROM cart_items ci
        JOIN product_variants pv ON pv.id = ci.variant_id
        WHERE ci.id = $1 AND ci.user_id = $2
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;
    let stock = stock.ok_or(AppError::NotFound)?;

    if payload.quantity == 0 {
        sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .execute(&state.pool)
            .await?;
    } else {
        if payload.quantity > stock.0 {
            return Err(AppError::BadRequest(format!(
                "Only {} left in stock",
                stock.0
            )));
        }
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .bind(payload.quantity)
            .execute(&state.pool)
            .await?;
    }

    let cart = load_cart(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("Cart updated", cart, None)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Remove a cart line", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::ack("Removed from cart")))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Empty the cart", body = ApiResponse<serde_json::Value>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    Ok(Json(ApiResponse::ack("Cart cleared")))
}
