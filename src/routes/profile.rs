use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, BankDetails, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertAddressRequest {
    /// "Home", "Work" or similar label.
    pub address_type: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertBankDetailsRequest {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
    pub upi_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/{id}",
            put(update_address).delete(delete_address),
        )
        .route("/bank-details", get(get_bank_details).put(upsert_bank_details))
}

#[utoipa::path(
    get,
    path = "/api/profile/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let me: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;
    let me = me.ok_or(AppError::NotFound)?;
    Ok(Json(ApiResponse::success("OK", me, None)))
}

#[utoipa::path(
    get,
    path = "/api/profile/addresses",
    responses(
        (status = 200, description = "List saved addresses", body = ApiResponse<Vec<Address>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Address>>>> {
    let items: Vec<Address> = sqlx::query_as(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, city",
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success("OK", items, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/profile/addresses",
    request_body = UpsertAddressRequest,
    responses(
        (status = 200, description = "Create an address", body = ApiResponse<Address>),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpsertAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let mut tx = state.pool.begin().await?;

    // Only one default address per user.
    if payload.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user.user_id)
            .execute(&mut *tx)
            .await?;
    }

    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses
            (id, user_id, address_type, street_address, city, state, zip_code, phone, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.address_type.trim())
    .bind(payload.street_address.trim())
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.zip_code.trim())
    .bind(payload.phone.as_deref().map(str::trim))
    .bind(payload.is_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(ApiResponse::success("Address saved", address, None)))
}

#[utoipa::path(
    put,
    path = "/api/profile/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    request_body = UpsertAddressRequest,
    responses(
        (status = 200, description = "Update an address", body = ApiResponse<Address>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let mut tx = state.pool.begin().await?;

    if payload.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND id <> $2")
            .bind(user.user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    let address: Option<Address> = sqlx::query_as(
        r#"
        UPDATE addresses
        SET address_type = $3, street_address = $4, city = $5, state = $6,
            zip_code = $7, phone = $8, is_default = $9
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(payload.address_type.trim())
    .bind(payload.street_address.trim())
    .bind(payload.city.trim())
    .bind(payload.state.trim())
    .bind(payload.zip_code.trim())
    .bind(payload.phone.as_deref().map(str::trim))
    .bind(payload.is_default)
    .fetch_optional(&mut *tx)
    .await?;

    let address = address.ok_or(AppError::NotFound)?;

    tx.commit().await?;

    Ok(Json(ApiResponse::success("Address updated", address, None)))
}

#[utoipa::path(
    delete,
    path = "/api/profile/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Delete an address", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(Json(ApiResponse::ack("Address deleted")))
}

#[utoipa::path(
    get,
    path = "/api/profile/bank-details",
    responses(
        (status = 200, description = "Bank details on file", body = ApiResponse<BankDetails>),
        (status = 404, description = "No bank details yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_bank_details(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BankDetails>>> {
    let details: Option<BankDetails> =
        sqlx::query_as("SELECT * FROM bank_details WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(&state.pool)
            .await?;
    let details = details.ok_or(AppError::NotFound)?;

    Ok(Json(ApiResponse::success("OK", details, None)))
}

#[utoipa::path(
    put,
    path = "/api/profile/bank-details",
    request_body = UpsertBankDetailsRequest,
    responses(
        (status = 200, description = "Create or replace bank details", body = ApiResponse<BankDetails>),
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn upsert_bank_details(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpsertBankDetailsRequest>,
) -> AppResult<Json<ApiResponse<BankDetails>>> {
    let details: BankDetails = sqlx::query_as(
        r#"
        INSERT INTO bank_details
            (user_id, account_holder_name, account_number, ifsc_code, bank_name, upi_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO UPDATE
        SET account_holder_name = EXCLUDED.account_holder_name,
            account_number = EXCLUDED.account_number,
            ifsc_code = EXCLUDED.ifsc_code,
            bank_name = EXCLUDED.bank_name,
            upi_id = EXCLUDED.upi_id,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(payload.account_holder_name.trim())
    .bind(payload.account_number.trim())
    .bind(payload.ifsc_code.trim())
    .bind(payload.bank_name.trim())
    .bind(payload.upi_id.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success("Bank details saved", details, None)))
}
