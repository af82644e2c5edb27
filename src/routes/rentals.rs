use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::rentals::{CreateRentalRequest, RentalList},
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::AuthUser,
    models::Rental,
    response::ApiResponse,
    services::rental_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rentals).post(create_rental))
        .route("/{id}/return", post(return_rental))
}

#[utoipa::path(
    get,
    path = "/api/rentals",
    responses(
        (status = 200, description = "Rentals of the current user, newest first", body = ApiResponse<RentalList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Rentals"
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RentalList>>> {
    let resp = rental_service::list_rentals(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/rentals",
    request_body = CreateRentalRequest,
    responses(
        (status = 201, description = "Rental created", body = ApiResponse<Rental>),
        (status = 400, description = "Missing fields, unknown period or book already rented"),
        (status = 404, description = "Book not found or unavailable"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Rentals"
)]
pub async fn create_rental(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateRentalRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Rental>>)> {
    let resp = rental_service::create_rental(&state, &user, payload, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/rentals/{id}/return",
    params(
        ("id" = Uuid, Path, description = "Rental ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ApiResponse<Rental>),
        (status = 400, description = "Already returned"),
        (status = 403, description = "Rental belongs to another user"),
        (status = 404, description = "Rental not found"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Rentals"
)]
pub async fn return_rental(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Rental>>> {
    let resp = rental_service::return_rental(&state, &user, id).await?;
    Ok(Json(resp))
}
