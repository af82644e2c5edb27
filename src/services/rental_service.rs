use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    dto::{
        admin::ReminderSummary,
        rentals::{CreateRentalRequest, RentalList, RentalWithBook},
    },
    entity::{
        books::{Column as BookCol, Entity as Books},
        rentals::{ActiveModel as RentalActive, Column as RentalCol, Entity as Rentals},
    },
    error::{AppError, AppResult},
    middleware::auth::{AdminUser, AuthUser},
    models::{BookSummary, Rental, RentalPeriod},
    response::{ApiResponse, Meta},
    services::cart_service::lock_user,
    state::AppState,
};

/// Rentals ending within this many days of the batch run get an "upcoming" reminder.
pub const REMINDER_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Upcoming,
    Overdue,
}

/// `Upcoming` for an end date in `(now, now + window]`, `Overdue` for one
/// strictly before `now`. A rental ending exactly at `now` is neither.
pub fn classify_reminder(end_date: DateTime<Utc>, now: DateTime<Utc>) -> Option<ReminderKind> {
    let horizon = now + Duration::days(REMINDER_WINDOW_DAYS);
    if end_date < now {
        Some(ReminderKind::Overdue)
    } else if end_date > now && end_date <= horizon {
        Some(ReminderKind::Upcoming)
    } else {
        None
    }
}

pub async fn list_rentals(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<RentalList>> {
    let items = Rentals::find()
        .filter(RentalCol::UserId.eq(user.user_id))
        .find_also_related(Books)
        .order_by_desc(RentalCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(rental, book)| -> AppResult<RentalWithBook> {
            let book = book.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("rental {} has no book", rental.id))
            })?;
            Ok(RentalWithBook {
                rental: Rental::try_from(rental)?,
                book: BookSummary::from(book),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("OK", RentalList { items }, Some(meta)))
}

pub async fn create_rental(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRentalRequest,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<Rental>> {
    let (Some(book_id), Some(period)) = (payload.book_id, payload.rental_period) else {
        return Err(AppError::BadRequest(
            "book_id and rental_period are required".into(),
        ));
    };
    let period: RentalPeriod = period.trim().parse()?;

    let txn = state.orm.begin().await?;
    lock_user(&txn, user.user_id).await?;

    let book = Books::find_by_id(book_id)
        .filter(BookCol::IsAvailable.eq(true))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let active_rental = Rentals::find()
        .filter(
            Condition::all()
                .add(RentalCol::UserId.eq(user.user_id))
                .add(RentalCol::BookId.eq(book.id))
                .add(RentalCol::IsReturned.eq(false)),
        )
        .one(&txn)
        .await?;
    if active_rental.is_some() {
        return Err(AppError::Conflict("You have already rented this book".into()));
    }

    let rental = RentalActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        book_id: Set(book.id),
        start_date: Set(now.into()),
        end_date: Set(period.end_date(now).into()),
        rental_period: Set(period.as_str().to_string()),
        is_returned: Set(false),
        reminder_sent: Set(false),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        rental_id = %rental.id,
        book_id = %book.id,
        period = period.as_str(),
        "book rented"
    );
    Ok(ApiResponse::success(
        "Rental created",
        Rental::try_from(rental)?,
        Some(Meta::empty()),
    ))
}

pub async fn return_rental(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Rental>> {
    let txn = state.orm.begin().await?;

    let rental = Rentals::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if rental.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if rental.is_returned {
        return Err(AppError::Conflict("Book is already returned".into()));
    }

    let mut active: RentalActive = rental.into();
    active.is_returned = Set(true);
    let rental = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, rental_id = %rental.id, "book returned");
    Ok(ApiResponse::success(
        "Book returned",
        Rental::try_from(rental)?,
        Some(Meta::empty()),
    ))
}

/// Flag every open, not-yet-reminded rental that is overdue or about to end.
/// Delivery of the reminder itself happens outside this service.
pub async fn send_reminders(
    state: &AppState,
    admin: &AdminUser,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<ReminderSummary>> {
    let horizon = now + Duration::days(REMINDER_WINDOW_DAYS);
    let txn = state.orm.begin().await?;

    let candidates = Rentals::find()
        .filter(
            Condition::all()
                .add(RentalCol::IsReturned.eq(false))
                .add(RentalCol::ReminderSent.eq(false))
                .add(RentalCol::EndDate.lte(horizon)),
        )
        .order_by_asc(RentalCol::EndDate)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    let mut upcoming = 0;
    let mut overdue = 0;
    let mut ids = Vec::new();
    for rental in &candidates {
        let Some(kind) = classify_reminder(rental.end_date.with_timezone(&Utc), now) else {
            continue;
        };
        match kind {
            ReminderKind::Upcoming => upcoming += 1,
            ReminderKind::Overdue => overdue += 1,
        }
        tracing::info!(
            rental_id = %rental.id,
            user_id = %rental.user_id,
            book_id = %rental.book_id,
            end_date = %rental.end_date,
            kind = ?kind,
            "rental reminder due"
        );
        ids.push(rental.id);
    }

    if !ids.is_empty() {
        Rentals::update_many()
            .col_expr(RentalCol::ReminderSent, Expr::value(true))
            .filter(RentalCol::Id.is_in(ids.iter().copied()))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    tracing::info!(
        admin_id = %admin.0.user_id,
        upcoming,
        overdue,
        "rental reminders flagged"
    );
    Ok(ApiResponse::success(
        "Reminders processed",
        ReminderSummary {
            success: true,
            upcoming,
            overdue,
            total: ids.len(),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn past_end_date_is_overdue() {
        let end = now() - Duration::seconds(1);
        assert_eq!(classify_reminder(end, now()), Some(ReminderKind::Overdue));
        let end = now() - Duration::days(40);
        assert_eq!(classify_reminder(end, now()), Some(ReminderKind::Overdue));
    }

    #[test]
    fn window_upper_bound_is_inclusive() {
        let end = now() + Duration::days(REMINDER_WINDOW_DAYS);
        assert_eq!(classify_reminder(end, now()), Some(ReminderKind::Upcoming));
        let end = now() + Duration::hours(1);
        assert_eq!(classify_reminder(end, now()), Some(ReminderKind::Upcoming));
    }

    #[test]
    fn outside_window_is_skipped() {
        let end = now() + Duration::days(REMINDER_WINDOW_DAYS) + Duration::seconds(1);
        assert_eq!(classify_reminder(end, now()), None);
        assert_eq!(classify_reminder(now(), now()), None);
    }
}
