use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{AdminRentalList, ReminderSummary, Stats},
        books::{BookList, BookPayload},
    },
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::AdminUser,
    models::Book,
    response::ApiResponse,
    services::{admin_service, book_service, rental_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/rental-reminders", post(send_rental_reminders))
        .route("/rentals", get(list_rentals))
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book)
                .put(replace_book)
                .patch(patch_book)
                .delete(delete_book),
        )
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<Stats>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stats(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<Stats>>> {
    let resp = admin_service::stats(&state, &admin, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/rental-reminders",
    responses(
        (status = 200, description = "Reminder batch processed", body = ApiResponse<ReminderSummary>),
        (status = 403, description = "Forbidden"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn send_rental_reminders(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<ReminderSummary>>> {
    let resp = rental_service::send_reminders(&state, &admin, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/rentals",
    responses(
        (status = 200, description = "All rentals with book, renter and overdue flag", body = ApiResponse<AdminRentalList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_rentals(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<AdminRentalList>>> {
    let resp = admin_service::list_rentals(&state, &admin, Utc::now()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/books",
    responses(
        (status = 200, description = "Every book, including unavailable ones", body = ApiResponse<BookList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_books(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<BookList>>> {
    let resp = book_service::list_all_books(&state, &admin).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = ApiResponse<Book>),
        (status = 400, description = "Missing or invalid field"),
        (status = 403, description = "Forbidden"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_book(
    State(state): State<AppState>,
    admin: AdminUser,
    AppJson(payload): AppJson<BookPayload>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let resp = book_service::create_book(&state, &admin, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/admin/books/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Get book", body = ApiResponse<Book>),
        (status = 404, description = "Not Found"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_book(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::get_book(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/books/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book replaced", body = ApiResponse<Book>),
        (status = 400, description = "Missing or invalid field"),
        (status = 404, description = "Not Found"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn replace_book(
    State(state): State<AppState>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<BookPayload>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::replace_book(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/books/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Book>),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Not Found"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn patch_book(
    State(state): State<AppState>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<BookPayload>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::patch_book(&state, &admin, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/books/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 400, description = "Book is referenced by orders or rentals"),
        (status = 404, description = "Not Found"),
    ),
    security(("session_cookie" = []), ("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_book(
    State(state): State<AppState>,
    admin: AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = book_service::delete_book(&state, &admin, id).await?;
    Ok(Json(resp))
}
