use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{
        CreateCategoryRequest, CreateProductRequest, CreateSubCategoryRequest,
        CreateVariantRequest, ProductDetail, ProductList, ProductSummary, UpdateProductRequest,
        UpdateVariantRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product, ProductImage, ProductTag, ProductVariant, Review, SubCategory},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy},
    state::AppState,
};

const SUMMARY_COLUMNS: &str = r#"
    p.id, p.name, p.description, p.category_id, p.subcategory_id, p.thumbnail_path,
    (SELECT MIN(pv.price) FROM product_variants pv
      WHERE pv.product_id = p.id AND pv.stock > 0 AND pv.expiry_date >= CURRENT_DATE
    ) AS starting_price,
    (SELECT ROUND(AVG(r.rating)::NUMERIC, 1)::FLOAT8 FROM reviews r WHERE r.product_id = p.id) AS average_rating,
    (SELECT COUNT(*) FROM reviews r WHERE r.product_id = p.id) AS review_count
"#;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, per_page, offset) = query.pagination.normalize();

    let filters = r#"
        WHERE p.is_active
          AND ($1::TEXT IS NULL OR p.name ILIKE '%' || $1 || '%' OR p.description ILIKE '%' || $1 || '%')
          AND ($2::UUID IS NULL OR p.category_id = $2)
          AND ($3::UUID IS NULL OR p.subcategory_id = $3)
          AND ($4::BIGINT IS NULL OR EXISTS (
              SELECT 1 FROM product_variants pv
              WHERE pv.product_id = p.id AND pv.price <= $4
          ))
    "#;

    let order_by = match query.sort.unwrap_or(ProductSortBy::Newest) {
        ProductSortBy::Newest => "p.created_at DESC",
        ProductSortBy::PriceLow => "starting_price ASC NULLS LAST",
        ProductSortBy::PriceHigh => "starting_price DESC NULLS LAST",
    };

    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM products p {filters} ORDER BY {order_by} LIMIT $5 OFFSET $6"
    );

    let items: Vec<ProductSummary> = sqlx::query_as(&sql)
        .bind(query.q.as_deref().map(str::trim))
        .bind(query.category_id)
        .bind(query.subcategory_id)
        .bind(query.max_price)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&state.pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM products p {filters}");
    let total: (i64,) = sqlx::query_as(&count_sql)
        .bind(query.q.as_deref().map(str::trim))
        .bind(query.category_id)
        .bind(query.subcategory_id)
        .bind(query.max_price)
        .fetch_one(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        ProductList { items },
        Some(Meta::new(page, per_page, total.0)),
    ))
}

pub async fn get_product(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<ProductDetail>> {
    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND is_active")
            .bind(product_id)
            .fetch_optional(&state.pool)
            .await?;
    let product = product.ok_or(AppError::NotFound)?;

    let variants: Vec<ProductVariant> = sqlx::query_as(
        "SELECT * FROM product_variants WHERE product_id = $1 ORDER BY price",
    )
    .bind(product.id)
    .fetch_all(&state.pool)
    .await?;

    let images: Vec<ProductImage> =
        sqlx::query_as("SELECT * FROM product_images WHERE product_id = $1")
            .bind(product.id)
            .fetch_all(&state.pool)
            .await?;

    let tags: Vec<ProductTag> = sqlx::query_as(
        r#"
        SELECT t.* FROM product_tags t
        JOIN product_tag_links l ON l.tag_id = t.id
        WHERE l.product_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(product.id)
    .fetch_all(&state.pool)
    .await?;

    let reviews: Vec<Review> = sqlx::query_as(
        "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
    )
    .bind(product.id)
    .fetch_all(&state.pool)
    .await?;

    let related_sql = format!(
        r#"
        SELECT {SUMMARY_COLUMNS} FROM products p
        WHERE p.is_active AND p.id <> $1
          AND ($2::UUID IS NOT NULL AND p.category_id = $2)
        ORDER BY p.created_at DESC
        LIMIT 4
        "#
    );
    let related: Vec<ProductSummary> = sqlx::query_as(&related_sql)
        .bind(product.id)
        .bind(product.category_id)
        .fetch_all(&state.pool)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        ProductDetail {
            product,
            variants,
            images,
            tags,
            reviews,
            related,
        },
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".into()));
    }

    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM categories WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(&state.pool)
            .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category: Category = sqlx::query_as(
        "INSERT INTO categories (id, name, image_path) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(payload.image_path.as_deref())
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Category created", category, None))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    category_id: Uuid,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".into()));
    }

    let taken: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM categories WHERE lower(name) = lower($1) AND id <> $2")
            .bind(name)
            .bind(category_id)
            .fetch_optional(&state.pool)
            .await?;
    if taken.is_some() {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category: Option<Category> = sqlx::query_as(
        "UPDATE categories SET name = $2, image_path = COALESCE($3, image_path) WHERE id = $1 RETURNING *",
    )
    .bind(category_id)
    .bind(name)
    .bind(payload.image_path.as_deref())
    .fetch_optional(&state.pool)
    .await?;

    let category = category.ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Category updated", category, None))
}

/// Products under a deleted category survive with `category_id` nulled out.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    category_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::ack("Category deleted"))
}

pub async fn create_subcategory(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubCategoryRequest,
) -> AppResult<ApiResponse<SubCategory>> {
    ensure_admin(user)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Subcategory name is required".into()));
    }

    let parent: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE id = $1")
        .bind(payload.category_id)
        .fetch_optional(&state.pool)
        .await?;
    if parent.is_none() {
        return Err(AppError::NotFound);
    }

    let exists: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM subcategories WHERE category_id = $1 AND lower(name) = lower($2)",
    )
    .bind(payload.category_id)
    .bind(name)
    .fetch_optional(&state.pool)
    .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Subcategory already exists".into()));
    }

    let subcategory: SubCategory = sqlx::query_as(
        "INSERT INTO subcategories (id, category_id, name) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.category_id)
    .bind(name)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Subcategory created", subcategory, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }

    let mut tx = state.pool.begin().await?;

    let product: Product = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description, category_id, subcategory_id, thumbnail_path)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(payload.description.as_deref().map(str::trim))
    .bind(payload.category_id)
    .bind(payload.subcategory_id)
    .bind(payload.thumbnail_path.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    for tag in &payload.tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let tag_row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO product_tags (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tag)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO product_tag_links (product_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(product.id)
        .bind(tag_row.0)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success("Product created", product, None))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let product: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            category_id = COALESCE($4, category_id),
            subcategory_id = COALESCE($5, subcategory_id),
            thumbnail_path = COALESCE($6, thumbnail_path),
            is_active = COALESCE($7, is_active),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.description.as_deref().map(str::trim))
    .bind(payload.category_id)
    .bind(payload.subcategory_id)
    .bind(payload.thumbnail_path.as_deref())
    .bind(payload.is_active)
    .fetch_optional(&state.pool)
    .await?;

    let product = product.ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Product updated", product, None))
}

/// Products that appear in any order keep their history; they can only
/// be deactivated, never deleted.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let ordered: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM order_items WHERE product_id = $1 LIMIT 1")
            .bind(product_id)
            .fetch_optional(&state.pool)
            .await?;
    if ordered.is_some() {
        return Err(AppError::Conflict(
            "Product has order history; deactivate it instead".into(),
        ));
    }

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await;

    Ok(ApiResponse::ack("Product deleted"))
}

pub async fn add_variant(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;

    if payload.price < 0 || payload.stock < 0 {
        return Err(AppError::BadRequest(
            "Price and stock cannot be negative".into(),
        ));
    }

    let product: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.pool)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let exists: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id FROM product_variants
        WHERE product_id = $1 AND unit_value = $2 AND unit_type = $3 AND batch_number = $4
        "#,
    )
    .bind(product_id)
    .bind(payload.unit_value)
    .bind(&payload.unit_type)
    .bind(&payload.batch_number)
    .fetch_optional(&state.pool)
    .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(
            "Variant with this size and batch already exists".into(),
        ));
    }

    let variant: ProductVariant = sqlx::query_as(
        r#"
        INSERT INTO product_variants
            (id, product_id, unit_value, unit_type, price, stock, batch_number,
             manufacturing_date, expiry_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(payload.unit_value)
    .bind(&payload.unit_type)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(&payload.batch_number)
    .bind(payload.manufacturing_date)
    .bind(payload.expiry_date)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Variant added", variant, None))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    variant_id: Uuid,
    payload: UpdateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;

    if payload.price.is_some_and(|p| p < 0) || payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest(
            "Price and stock cannot be negative".into(),
        ));
    }

    let variant: Option<ProductVariant> = sqlx::query_as(
        r#"
        UPDATE product_variants
        SET price = COALESCE($2, price),
            stock = COALESCE($3, stock),
            expiry_date = COALESCE($4, expiry_date)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(variant_id)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.expiry_date)
    .fetch_optional(&state.pool)
    .await?;

    let variant = variant.ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Variant updated", variant, None))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    variant_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM product_variants WHERE id = $1")
        .bind(variant_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::ack("Variant deleted"))
}
