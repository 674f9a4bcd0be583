use axum::{Json, Router, extract::State, routing::get, routing::post};
use uuid::Uuid;

use crate::{
    dto::cart::{ToggleWishlistRequest, WishlistEntry, WishlistList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlist))
        .route("/toggle", post(toggle_wishlist))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Wishlist entries with product info", body = ApiResponse<WishlistList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn list_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistList>>> {
    let items: Vec<WishlistEntry> = sqlx::query_as(
        r#"
        SELECT w.id, w.product_id, p.name AS product_name, p.thumbnail_path,
               w.variant_id, pv.price, w.added_at
        FROM wishlist_items w
        JOIN products p ON p.id = w.product_id
        LEFT JOIN product_variants pv ON pv.id = w.variant_id
        WHERE w.user_id = $1
        ORDER BY w.added_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(
        "OK",
        WishlistList { items },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/wishlist/toggle",
    request_body = ToggleWishlistRequest,
    responses(
        (status = 200, description = "Add the entry if absent, remove it if present", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Unknown product"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ToggleWishlistRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active")
            .bind(payload.product_id)
            .fetch_optional(&state.pool)
            .await?;
    if product.is_none() {
        return Err(AppError::BadRequest("product not found".to_string()));
    }

    let removed = sqlx::query(
        r#"
        DELETE FROM wishlist_items
        WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3
        "#,
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.variant_id)
    .execute(&state.pool)
    .await?;

    if removed.rows_affected() > 0 {
        return Ok(Json(ApiResponse::ack("Removed from wishlist")));
    }

    sqlx::query(
        "INSERT INTO wishlist_items (id, user_id, product_id, variant_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.variant_id)
    .execute(&state.pool)
    .await?;

    Ok(Json(ApiResponse::ack("Added to wishlist")))
}
