use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AdminDashboard, CouponList, CreateCouponRequest, LowStockQuery, LowStockRow,
            UpdateCouponRequest, UpdateOrderStatusRequest,
        },
        catalog::{
            CreateCategoryRequest, CreateProductRequest, CreateSubCategoryRequest,
            CreateVariantRequest, UpdateProductRequest, UpdateVariantRequest,
        },
        delivery::{ReplyTicketRequest, TicketList},
        orders::{OrderList, OrderWithItems},
        returns::{ProcessRefundRequest, ReturnDecisionRequest, ReturnList},
        salary::{CreateSalaryRequest, PaySalaryRequest, SalaryList, UpdateSalaryStatusRequest},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        Category, Coupon, HelpdeskTicket, Order, Product, ProductVariant, Refund, Return,
        SalaryPayment, SubCategory,
    },
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{admin_service, catalog_service, return_service, salary_service},
    state::AppState,
};

/// Delivery partner as shown on the admin roster.
#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct PartnerRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub vehicle_type: String,
    pub vehicle_number: String,
    pub base_salary: i64,
    pub is_active: bool,
    pub active_orders: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/low-stock", get(list_low_stock))
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/status", put(update_order_status))
        .route("/categories", post(create_category))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/subcategories", post(create_subcategory))
        .route("/products", post(create_product))
        .route(
            "/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/products/{id}/variants", post(add_variant))
        .route(
            "/variants/{id}",
            put(update_variant).delete(delete_variant),
        )
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/{id}", put(update_coupon).delete(delete_coupon))
        .route("/returns", get(list_returns))
        .route("/returns/{id}/decision", put(decide_return))
        .route("/refunds", get(list_refunds))
        .route("/refunds/{id}", put(process_refund))
        .route("/partners", get(list_partners))
        .route("/salaries", get(list_salaries).post(create_salary))
        .route("/salaries/{id}/pay", post(pay_salary))
        .route("/salaries/{id}/status", put(update_salary_status))
        .route("/helpdesk", get(list_tickets))
        .route("/helpdesk/{id}/reply", put(reply_ticket))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Store-wide stats, recent orders and low stock", body = ApiResponse<AdminDashboard>),
        (status = 403, description = "Not an admin"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AdminDashboard>>> {
    let resp = admin_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/low-stock",
    params(("threshold" = Option<i32>, Query, description = "Stock at or under this count, default 5")),
    responses(
        (status = 200, description = "Variants running low", body = ApiResponse<Vec<LowStockRow>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<Vec<LowStockRow>>>> {
    let resp = admin_service::low_stock(&state, &user, query.threshold).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("sort_order" = Option<String>, Query, description = "asc | desc by created_at")
    ),
    responses(
        (status = 200, description = "All orders across customers", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Any order with items and payment", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Override the order status", body = ApiResponse<Order>),
        (status = 400, description = "Invalid transition"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Create a category", body = ApiResponse<Category>),
        (status = 409, description = "Duplicate name"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::create_category(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Rename a category", body = ApiResponse<Category>),
        (status = 409, description = "Duplicate name"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::update_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Delete a category, detaching its products", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/subcategories",
    request_body = CreateSubCategoryRequest,
    responses(
        (status = 200, description = "Create a subcategory", body = ApiResponse<SubCategory>),
        (status = 409, description = "Duplicate name within the category"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_subcategory(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubCategoryRequest>,
) -> AppResult<Json<ApiResponse<SubCategory>>> {
    let resp = catalog_service::create_subcategory(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Create a product with tags", body = ApiResponse<Product>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = catalog_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Update product fields", body = ApiResponse<Product>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = catalog_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Delete a product that was never ordered", body = ApiResponse<serde_json::Value>),
        (status = 409, description = "Product has order history"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateVariantRequest,
    responses(
        (status = 200, description = "Add a variant", body = ApiResponse<ProductVariant>),
        (status = 409, description = "Duplicate size and batch"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = catalog_service::add_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant id")),
    request_body = UpdateVariantRequest,
    responses(
        (status = 200, description = "Update price, stock or expiry", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVariantRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = catalog_service::update_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant id")),
    responses(
        (status = 200, description = "Delete a variant", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_variant(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/coupons",
    responses(
        (status = 200, description = "All coupons", body = ApiResponse<CouponList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CouponList>>> {
    let resp = admin_service::list_coupons(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 200, description = "Create a coupon", body = ApiResponse<Coupon>),
        (status = 409, description = "Duplicate code"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = admin_service::create_coupon(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Update a coupon", body = ApiResponse<Coupon>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> AppResult<Json<ApiResponse<Coupon>>> {
    let resp = admin_service::update_coupon(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Delete a coupon", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_coupon(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/returns",
    responses(
        (status = 200, description = "All return requests", body = ApiResponse<ReturnList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_returns(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReturnList>>> {
    let resp = return_service::list_all_returns(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/returns/{id}/decision",
    params(("id" = Uuid, Path, description = "Return id")),
    request_body = ReturnDecisionRequest,
    responses(
        (status = 200, description = "Approve or reject; approval assigns a pickup partner", body = ApiResponse<Return>),
        (status = 400, description = "Return already decided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn decide_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnDecisionRequest>,
) -> AppResult<Json<ApiResponse<Return>>> {
    let resp = return_service::decide_return(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/refunds",
    responses(
        (status = 200, description = "All refunds", body = ApiResponse<Vec<Refund>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_refunds(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Refund>>>> {
    let resp = return_service::list_refunds(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/refunds/{id}",
    params(("id" = Uuid, Path, description = "Refund id")),
    request_body = ProcessRefundRequest,
    responses(
        (status = 200, description = "Mark a refund processed or failed", body = ApiResponse<Refund>),
        (status = 400, description = "Refund is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn process_refund(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessRefundRequest>,
) -> AppResult<Json<ApiResponse<Refund>>> {
    let resp = return_service::process_refund(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/partners",
    responses(
        (status = 200, description = "Delivery partner roster with current workload", body = ApiResponse<Vec<PartnerRow>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_partners(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<PartnerRow>>>> {
    ensure_admin(&user)?;

    let items: Vec<PartnerRow> = sqlx::query_as(
        r#"
        SELECT u.id AS user_id, u.full_name, u.email, u.phone,
               dp.vehicle_type, dp.vehicle_number, dp.base_salary, dp.is_active,
               COUNT(o.id) AS active_orders
        FROM users u
        JOIN delivery_profiles dp ON dp.user_id = u.id
        LEFT JOIN orders o ON o.assigned_to = u.id AND o.status IN ('Pending', 'Shipped', 'On Way')
        WHERE u.role = 'Delivery'
        GROUP BY u.id, u.full_name, u.email, u.phone,
                 dp.vehicle_type, dp.vehicle_number, dp.base_salary, dp.is_active
        ORDER BY u.full_name
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success("OK", items, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/admin/salaries",
    responses(
        (status = 200, description = "All salary records", body = ApiResponse<SalaryList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_salaries(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SalaryList>>> {
    let resp = salary_service::list_salaries(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/salaries",
    request_body = CreateSalaryRequest,
    responses(
        (status = 200, description = "Create a monthly salary record", body = ApiResponse<SalaryPayment>),
        (status = 409, description = "Record for this month already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_salary(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSalaryRequest>,
) -> AppResult<Json<ApiResponse<SalaryPayment>>> {
    let resp = salary_service::create_salary(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/salaries/{id}/pay",
    params(("id" = Uuid, Path, description = "Salary record id")),
    request_body = PaySalaryRequest,
    responses(
        (status = 200, description = "Pay a salary, snapshotting bank coordinates", body = ApiResponse<SalaryPayment>),
        (status = 400, description = "Wrong status or missing bank details"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn pay_salary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaySalaryRequest>,
) -> AppResult<Json<ApiResponse<SalaryPayment>>> {
    let resp = salary_service::pay_salary(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/salaries/{id}/status",
    params(("id" = Uuid, Path, description = "Salary record id")),
    request_body = UpdateSalaryStatusRequest,
    responses(
        (status = 200, description = "Hold or cancel an unpaid salary", body = ApiResponse<SalaryPayment>),
        (status = 400, description = "Record is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_salary_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSalaryStatusRequest>,
) -> AppResult<Json<ApiResponse<SalaryPayment>>> {
    let resp = salary_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/helpdesk",
    responses(
        (status = 200, description = "Helpdesk queue, open tickets first", body = ApiResponse<TicketList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = admin_service::list_tickets(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/helpdesk/{id}/reply",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = ReplyTicketRequest,
    responses(
        (status = 200, description = "Reply to and resolve a ticket", body = ApiResponse<HelpdeskTicket>),
        (status = 400, description = "Ticket is not open"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reply_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyTicketRequest>,
) -> AppResult<Json<ApiResponse<HelpdeskTicket>>> {
    let resp = admin_service::reply_ticket(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
