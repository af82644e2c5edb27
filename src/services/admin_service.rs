use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::admin::{AdminRental, AdminRentalList, Stats},
    entity::{
        books::Entity as Books,
        orders::{Column as OrderCol, Entity as Orders},
        rentals::{Column as RentalCol, Entity as Rentals},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AdminUser,
    models::{BookSummary, OrderStatus, Rental, UserSummary},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Midnight UTC on the first day of `now`'s calendar month.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

pub async fn stats(
    state: &AppState,
    _admin: &AdminUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<Stats>> {
    let total_books = Books::find().count(&state.orm).await?;
    let total_users = Users::find().count(&state.orm).await?;
    let active_rentals = Rentals::find()
        .filter(RentalCol::IsReturned.eq(false))
        .count(&state.orm)
        .await?;
    let orders_this_month = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Status.eq(OrderStatus::Paid.as_str()))
                .add(OrderCol::CreatedAt.gte(start_of_month(now))),
        )
        .count(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Stats",
        Stats {
            total_books,
            total_users,
            active_rentals,
            orders_this_month,
        },
        Some(Meta::empty()),
    ))
}

/// Every rental with its book and renter, newest first.
pub async fn list_rentals(
    state: &AppState,
    _admin: &AdminUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<AdminRentalList>> {
    let rows = Rentals::find()
        .find_also_related(Books)
        .order_by_desc(RentalCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let user_ids: Vec<Uuid> = rows.iter().map(|(rental, _)| rental.user_id).collect();
    let users: HashMap<Uuid, UserSummary> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        Users::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|user| (user.id, UserSummary::from(user)))
            .collect()
    };

    let items = rows
        .into_iter()
        .map(|(rental, book)| -> AppResult<AdminRental> {
            let book = book.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("rental {} has no book", rental.id))
            })?;
            let user = users.get(&rental.user_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("rental {} has no user", rental.id))
            })?;
            let rental = Rental::try_from(rental)?;
            Ok(AdminRental {
                is_overdue: !rental.is_returned && rental.end_date < now,
                rental,
                book: BookSummary::from(book),
                user,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Rentals", AdminRentalList { items }, Some(meta)))
}
