use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::catalog::{ProductDetail, ProductList},
    error::AppResult,
    models::{Category, SubCategory},
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::catalog_service,
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryWithSubs {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<SubCategory>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Name search"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by category"),
        ("subcategory_id" = Option<Uuid>, Query, description = "Filter by subcategory"),
        ("max_price" = Option<i64>, Query, description = "Keep products with a variant at or under this price (paise)"),
        ("sort" = Option<String>, Query, description = "newest | price_low | price_high")
    ),
    responses(
        (status = 200, description = "Storefront product listing", body = ApiResponse<ProductList>),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = catalog_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/categories",
    responses(
        (status = 200, description = "Categories with their subcategories", body = ApiResponse<Vec<CategoryWithSubs>>),
    ),
    tag = "Products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<CategoryWithSubs>>>> {
    let categories: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    let subcategories: Vec<SubCategory> =
        sqlx::query_as("SELECT * FROM subcategories ORDER BY name")
            .fetch_all(&state.pool)
            .await?;

    let data = categories
        .into_iter()
        .map(|category| {
            let subs = subcategories
                .iter()
                .filter(|s| s.category_id == category.id)
                .map(|s| SubCategory {
                    id: s.id,
                    category_id: s.category_id,
                    name: s.name.clone(),
                })
                .collect();
            CategoryWithSubs {
                category,
                subcategories: subs,
            }
        })
        .collect();

    Ok(Json(ApiResponse::success("OK", data, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product detail with variants, reviews and related items", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = catalog_service::get_product(&state, id).await?;
    Ok(Json(resp))
}
