use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    dto::{
        cart::OrderItemWithBook,
        orders::{CheckoutRequest, OrderList, OrderWithItems},
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::cart_service::{items_with_books, refresh_total},
    state::AppState,
};

/// Finalized orders of the caller, newest first. The open cart is not listed.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize()?;
    let finder = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Status.ne(OrderStatus::Pending.as_str())),
        )
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped: HashMap<Uuid, Vec<OrderItemWithBook>> = HashMap::new();
    for item in items_with_books(&state.orm, &ids).await? {
        grouped.entry(item.order_id).or_default().push(item);
    }

    let items = orders
        .into_iter()
        .map(|model| -> AppResult<OrderWithItems> {
            let items = grouped.remove(&model.id).unwrap_or_default();
            Ok(OrderWithItems {
                order: Order::try_from(model)?,
                items,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = items_with_books(&state.orm, &[order.id]).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::try_from(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Move the caller's PENDING order to PAID. The order must hold at least one item.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    let order_id = payload
        .order_id
        .ok_or_else(|| AppError::BadRequest("order_id is required".into()))?;

    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order_id))
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Status.eq(OrderStatus::Pending.as_str())),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let item_count = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .count(&txn)
        .await?;
    if item_count == 0 {
        return Err(AppError::Conflict("Order has no items".into()));
    }

    let total = refresh_total(&txn, order.id).await?;

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Paid.as_str().to_string());
    active.total_amount = Set(total);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, order_id = %order.id, total, "order checked out");
    Ok(ApiResponse::success(
        "Checkout success",
        Order::try_from(order)?,
        Some(Meta::empty()),
    ))
}
