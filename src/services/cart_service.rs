use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, OrderItemWithBook, UpdateCartItemRequest},
    entity::{
        books::{Column as BookCol, Entity as Books, Model as BookModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{BookSummary, OrderStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Sum of snapshot price times quantity. Live book prices never enter the total.
pub fn order_total(items: &[OrderItemModel]) -> AppResult<i64> {
    items
        .iter()
        .try_fold(0i64, |total, item| {
            item.price
                .checked_mul(i64::from(item.quantity))
                .and_then(|line| total.checked_add(line))
        })
        .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))
}

pub fn validate_quantity(quantity: Option<i32>) -> AppResult<i32> {
    match quantity {
        Some(q) if q >= 1 => Ok(q),
        Some(_) => Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        )),
        None => Err(AppError::BadRequest("quantity is required".to_string())),
    }
}

/// Serializes every cart and rental mutation of one user behind their `users` row.
pub(crate) async fn lock_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    Users::find_by_id(user_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(())
}

pub(crate) async fn find_pending_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<OrderModel>> {
    let order = Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
        .lock(LockType::Update)
        .one(conn)
        .await?;
    Ok(order)
}

/// Re-read all line items of an order and persist their sum as the order total.
pub(crate) async fn refresh_total<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<i64> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let total = order_total(&items)?;

    Orders::update_many()
        .col_expr(OrderCol::TotalAmount, Expr::value(total))
        .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(OrderCol::Id.eq(order_id))
        .exec(conn)
        .await?;

    Ok(total)
}

pub(crate) fn item_with_book(
    item: OrderItemModel,
    book: Option<BookModel>,
) -> AppResult<OrderItemWithBook> {
    let book = book.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("order item {} has no book", item.id))
    })?;
    Ok(OrderItemWithBook {
        id: item.id,
        order_id: item.order_id,
        book_id: item.book_id,
        quantity: item.quantity,
        price: item.price,
        book: BookSummary::from(book),
    })
}

/// Line items with their book summaries for every order in `order_ids`.
pub(crate) async fn items_with_books<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[Uuid],
) -> AppResult<Vec<OrderItemWithBook>> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids.iter().copied()))
        .find_also_related(Books)
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(|(item, book)| item_with_book(item, book))
        .collect()
}

async fn cart_view<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<CartView> {
    let order = Orders::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let order_items = items_with_books(conn, &[order.id]).await?;
    Ok(CartView {
        id: Some(order.id),
        status: Some(order.status.parse()?),
        total_amount: order.total_amount,
        order_items,
    })
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let order = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
        .one(&state.orm)
        .await?;

    let cart = match order {
        Some(order) => cart_view(&state.orm, order.id).await?,
        None => CartView::empty(),
    };
    let meta = Meta::total(cart.order_items.len());
    Ok(ApiResponse::success("OK", cart, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let book_id = payload
        .book_id
        .ok_or_else(|| AppError::BadRequest("book_id is required".to_string()))?;
    let quantity = validate_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    lock_user(&txn, user.user_id).await?;

    let book = Books::find_by_id(book_id)
        .filter(BookCol::IsAvailable.eq(true))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = match find_pending_order(&txn, user.user_id).await? {
        Some(order) => order,
        None => {
            OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                status: Set(OrderStatus::Pending.as_str().to_string()),
                total_amount: Set(0),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    let existing = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .filter(OrderItemCol::BookId.eq(book.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let new_quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| AppError::BadRequest("quantity is too large".to_string()))?;
            let mut active: OrderItemActive = item.into();
            active.quantity = Set(new_quantity);
            active.update(&txn).await?;
        }
        None => {
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                book_id: Set(book.id),
                quantity: Set(quantity),
                price: Set(book.price),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    let total = refresh_total(&txn, order.id).await?;
    let cart = cart_view(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        book_id = %book.id,
        quantity,
        total,
        "book added to cart"
    );
    Ok(ApiResponse::success("Added to cart", cart, None))
}

/// Lock an item and its order, checking the caller owns a still-open cart.
async fn owned_cart_item<C: ConnectionTrait>(
    conn: &C,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<(OrderItemModel, OrderModel)> {
    let item = OrderItems::find_by_id(item_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let order = Orders::find_by_id(item.order_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::Conflict("order is already finalized".to_string()));
    }
    Ok((item, order))
}

pub async fn update_item_quantity(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = validate_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    lock_user(&txn, user.user_id).await?;
    let (item, order) = owned_cart_item(&txn, user, item_id).await?;

    let mut active: OrderItemActive = item.into();
    active.quantity = Set(quantity);
    active.update(&txn).await?;

    let total = refresh_total(&txn, order.id).await?;
    let cart = cart_view(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, item_id = %item_id, quantity, total, "cart item updated");
    Ok(ApiResponse::success("Cart updated", cart, None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    lock_user(&txn, user.user_id).await?;
    let (item, order) = owned_cart_item(&txn, user, item_id).await?;

    OrderItems::delete_by_id(item.id).exec(&txn).await?;

    let remaining = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .count(&txn)
        .await?;

    let cart = if remaining == 0 {
        Orders::delete_by_id(order.id).exec(&txn).await?;
        tracing::debug!(order_id = %order.id, "empty cart removed");
        CartView::empty()
    } else {
        refresh_total(&txn, order.id).await?;
        cart_view(&txn, order.id).await?
    };
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, item_id = %item_id, "cart item removed");
    Ok(ApiResponse::success("Removed from cart", cart, None))
}
