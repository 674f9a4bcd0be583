use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::returns::{ReturnList, ReturnWithRefund, SubmitReturnRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Return,
    response::ApiResponse,
    services::return_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_returns).post(submit_return))
        .route("/{id}", get(get_return))
}

#[utoipa::path(
    post,
    path = "/api/returns",
    request_body = SubmitReturnRequest,
    responses(
        (status = 200, description = "Open a return for a delivered order", body = ApiResponse<Return>),
        (status = 400, description = "Order not delivered or invalid reason"),
        (status = 409, description = "A return already exists for the order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn submit_return(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitReturnRequest>,
) -> AppResult<Json<ApiResponse<Return>>> {
    let resp = return_service::submit_return(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/returns",
    responses(
        (status = 200, description = "List the current user's returns", body = ApiResponse<ReturnList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn list_my_returns(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReturnList>>> {
    let resp = return_service::list_my_returns(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/returns/{id}",
    params(("id" = Uuid, Path, description = "Return id")),
    responses(
        (status = 200, description = "Return with its refund, when one exists", body = ApiResponse<ReturnWithRefund>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Returns"
)]
pub async fn get_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReturnWithRefund>>> {
    let resp = return_service::get_return(&state, &user, id).await?;
    Ok(Json(resp))
}
