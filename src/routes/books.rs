use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::books::{BookFilters, BookList, BookQuery, NewArrivalsQuery},
    error::AppResult,
    extract::{AppPath, AppQuery},
    models::Book,
    response::ApiResponse,
    services::book_service::{self, DEFAULT_NEW_ARRIVALS},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books))
        .route("/filters", get(book_filters))
        .route("/new-arrivals", get(new_arrivals))
        .route("/{id}", get(get_book))
}

#[utoipa::path(
    get,
    path = "/api/books",
    params(BookQuery),
    responses(
        (status = 200, description = "Available books matching the filters, by title", body = ApiResponse<BookList>)
    ),
    tag = "Books"
)]
pub async fn list_books(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<BookQuery>,
) -> AppResult<Json<ApiResponse<BookList>>> {
    let resp = book_service::list_books(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/books/filters",
    responses(
        (status = 200, description = "Distinct categories, authors and years", body = ApiResponse<BookFilters>)
    ),
    tag = "Books"
)]
pub async fn book_filters(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BookFilters>>> {
    let resp = book_service::book_filters(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/books/new-arrivals",
    params(NewArrivalsQuery),
    responses(
        (status = 200, description = "Most recently added available books", body = ApiResponse<BookList>)
    ),
    tag = "Books"
)]
pub async fn new_arrivals(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NewArrivalsQuery>,
) -> AppResult<Json<ApiResponse<BookList>>> {
    let limit = query.limit.unwrap_or(DEFAULT_NEW_ARRIVALS);
    let resp = book_service::new_arrivals(&state, limit).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Get book", body = ApiResponse<Book>),
        (status = 404, description = "Book not found"),
    ),
    tag = "Books"
)]
pub async fn get_book(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::get_book(&state, id).await?;
    Ok(Json(resp))
}
