use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    dto::books::{BookFilters, BookList, BookPayload, BookQuery},
    entity::books::{ActiveModel, Column, Entity as Books},
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::Book,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const DEFAULT_NEW_ARRIVALS: u64 = 3;

/// Exact-match catalog filter over available books. Blank values are ignored.
pub fn catalog_condition(query: &BookQuery) -> Condition {
    let mut condition = Condition::all().add(Column::IsAvailable.eq(true));
    if let Some(category) = query.category.as_ref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(Column::Category.eq(category.trim()));
    }
    if let Some(author) = query.author.as_ref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(Column::Author.eq(author.trim()));
    }
    if let Some(year) = query.year {
        condition = condition.add(Column::Year.eq(year));
    }
    condition
}

pub async fn list_books(state: &AppState, query: BookQuery) -> AppResult<ApiResponse<BookList>> {
    let items: Vec<Book> = Books::find()
        .filter(catalog_condition(&query))
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Book::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Books", BookList { items }, Some(meta)))
}

pub async fn book_filters(state: &AppState) -> AppResult<ApiResponse<BookFilters>> {
    let categories = Books::find()
        .select_only()
        .column(Column::Category)
        .distinct()
        .filter(Column::IsAvailable.eq(true))
        .order_by_asc(Column::Category)
        .into_tuple::<String>()
        .all(&state.orm)
        .await?;

    let authors = Books::find()
        .select_only()
        .column(Column::Author)
        .distinct()
        .filter(Column::IsAvailable.eq(true))
        .order_by_asc(Column::Author)
        .into_tuple::<String>()
        .all(&state.orm)
        .await?;

    let years = Books::find()
        .select_only()
        .column(Column::Year)
        .distinct()
        .filter(Column::IsAvailable.eq(true))
        .order_by_desc(Column::Year)
        .into_tuple::<i32>()
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Filters",
        BookFilters {
            categories,
            authors,
            years,
        },
        Some(Meta::empty()),
    ))
}

pub async fn new_arrivals(state: &AppState, limit: u64) -> AppResult<ApiResponse<BookList>> {
    let items: Vec<Book> = Books::find()
        .filter(Column::IsAvailable.eq(true))
        .order_by_desc(Column::CreatedAt)
        .limit(limit.clamp(1, 50))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Book::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("New arrivals", BookList { items }, Some(meta)))
}

pub async fn get_book(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Book>> {
    let book = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Book::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Book", book, None))
}

pub async fn list_all_books(
    state: &AppState,
    _admin: &AdminUser,
) -> AppResult<ApiResponse<BookList>> {
    let items: Vec<Book> = Books::find()
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Book::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Books", BookList { items }, Some(meta)))
}

pub async fn create_book(
    state: &AppState,
    admin: &AdminUser,
    payload: BookPayload,
) -> AppResult<ApiResponse<Book>> {
    let new_book = payload.into_new_book()?;
    let book = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(new_book.title),
        author: Set(new_book.author),
        category: Set(new_book.category),
        year: Set(new_book.year),
        description: Set(new_book.description),
        price: Set(new_book.price),
        rental_price: Set(new_book.rental_price),
        image_url: Set(new_book.image_url),
        is_available: Set(new_book.is_available),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(admin_id = %admin.0.user_id, book_id = %book.id, "book created");
    Ok(ApiResponse::success(
        "Book created",
        Book::from(book),
        Some(Meta::empty()),
    ))
}

pub async fn replace_book(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    payload: BookPayload,
) -> AppResult<ApiResponse<Book>> {
    let new_book = payload.into_new_book()?;
    let existing = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.title = Set(new_book.title);
    active.author = Set(new_book.author);
    active.category = Set(new_book.category);
    active.year = Set(new_book.year);
    active.description = Set(new_book.description);
    active.price = Set(new_book.price);
    active.rental_price = Set(new_book.rental_price);
    active.image_url = Set(new_book.image_url);
    active.is_available = Set(new_book.is_available);
    let book = active.update(&state.orm).await?;

    tracing::info!(admin_id = %admin.0.user_id, book_id = %book.id, "book replaced");
    Ok(ApiResponse::success(
        "Updated",
        Book::from(book),
        Some(Meta::empty()),
    ))
}

pub async fn patch_book(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
    payload: BookPayload,
) -> AppResult<ApiResponse<Book>> {
    let patch = payload.into_patch()?;
    let existing = Books::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.clone().into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(author) = patch.author {
        active.author = Set(author);
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(year) = patch.year {
        active.year = Set(year);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(price) = patch.price {
        active.price = Set(price);
    }
    if let Some(rental_price) = patch.rental_price {
        active.rental_price = Set(rental_price);
    }
    if let Some(image_url) = patch.image_url {
        active.image_url = Set(image_url);
    }
    if let Some(is_available) = patch.is_available {
        active.is_available = Set(is_available);
    }

    let book = if active.is_changed() {
        active.update(&state.orm).await?
    } else {
        existing
    };

    tracing::info!(admin_id = %admin.0.user_id, book_id = %book.id, "book patched");
    Ok(ApiResponse::success(
        "Updated",
        Book::from(book),
        Some(Meta::empty()),
    ))
}

pub async fn delete_book(
    state: &AppState,
    admin: &AdminUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Books::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => {
                AppError::Conflict("book is referenced by orders or rentals".into())
            }
            other => other,
        })?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(admin_id = %admin.0.user_id, book_id = %id, "book deleted");
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "success": true }),
        Some(Meta::empty()),
    ))
}
