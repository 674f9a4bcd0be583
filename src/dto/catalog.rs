use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, ProductImage, ProductTag, ProductVariant, Review};

/// Listing row: product plus the aggregates the storefront grid shows.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub thumbnail_path: Option<String>,
    pub starting_price: Option<i64>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
    pub tags: Vec<ProductTag>,
    pub reviews: Vec<Review>,
    pub related: Vec<ProductSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubCategoryRequest {
    pub category_id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub thumbnail_path: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub unit_value: i32,
    pub unit_type: String,
    pub price: i64,
    pub stock: i32,
    pub batch_number: String,
    pub manufacturing_date: Option<chrono::NaiveDate>,
    pub expiry_date: chrono::NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVariantRequest {
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub expiry_date: Option<chrono::NaiveDate>,
}
