use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub product_id: Uuid,
    /// 1 to 5 stars.
    pub rating: i32,
    pub comment: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_review))
        .route("/{product_id}", axum::routing::delete(delete_review))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Create or replace the user's review of a product", body = ApiResponse<Review>),
        (status = 403, description = "Product was never delivered to this user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("Rating must be 1 to 5".into()));
    }
    let comment = payload.comment.trim();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }

    // Reviews are limited to products the user actually received.
    let purchase: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT o.id FROM orders o
        JOIN order_items oi ON oi.order_id = o.id
        WHERE o.user_id = $1 AND o.status = 'Delivered' AND oi.product_id = $2
        ORDER BY o.delivered_at DESC
        LIMIT 1
        "#,
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .fetch_optional(&state.pool)
    .await?;
    let Some((order_id,)) = purchase else {
        return Err(AppError::Forbidden);
    };

    let review: Review = sqlx::query_as(
        r#"
        INSERT INTO reviews (id, user_id, product_id, order_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, product_id) DO UPDATE
        SET rating = EXCLUDED.rating,
            comment = EXCLUDED.comment,
            order_id = EXCLUDED.order_id,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(order_id)
    .bind(payload.rating)
    .bind(comment)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success("Review saved", review, None)))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Delete the user's review of a product", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM reviews WHERE user_id = $1 AND product_id = $2")
        .bind(user.user_id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::ack("Review deleted")))
}
