use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{books, orders, rentals, users},
    error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(AppError::Internal(anyhow::anyhow!("unknown role {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown order status {other}"
            ))),
        }
    }
}

/// Fixed-length rental durations offered at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalPeriod {
    TwoWeeks,
    OneMonth,
    ThreeMonths,
}

impl RentalPeriod {
    pub const ALL: [RentalPeriod; 3] = [
        RentalPeriod::TwoWeeks,
        RentalPeriod::OneMonth,
        RentalPeriod::ThreeMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalPeriod::TwoWeeks => "TWO_WEEKS",
            RentalPeriod::OneMonth => "ONE_MONTH",
            RentalPeriod::ThreeMonths => "THREE_MONTHS",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            RentalPeriod::TwoWeeks => 14,
            RentalPeriod::OneMonth => 30,
            RentalPeriod::ThreeMonths => 90,
        }
    }

    pub fn end_date(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::days(self.days())
    }
}

impl FromStr for RentalPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RentalPeriod::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "rental_period must be one of TWO_WEEKS, ONE_MONTH, THREE_MONTHS (got '{s}')"
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub category: String,
    pub year: i32,
    pub description: String,
    pub price: i64,
    pub rental_price: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rental_period: RentalPeriod,
    pub is_returned: bool,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<users::Model> for User {
    type Error = AppError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        Ok(User {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role.parse()?,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        UserSummary {
            id: model.id,
            name: model.name,
            email: model.email,
        }
    }
}

impl From<books::Model> for Book {
    fn from(model: books::Model) -> Self {
        Book {
            id: model.id,
            title: model.title,
            author: model.author,
            category: model.category,
            year: model.year,
            description: model.description,
            price: model.price,
            rental_price: model.rental_price,
            image_url: model.image_url,
            is_available: model.is_available,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<books::Model> for BookSummary {
    fn from(model: books::Model) -> Self {
        BookSummary {
            id: model.id,
            title: model.title,
            author: model.author,
            image_url: model.image_url,
        }
    }
}

impl TryFrom<orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: orders::Model) -> Result<Self, Self::Error> {
        Ok(Order {
            id: model.id,
            user_id: model.user_id,
            status: model.status.parse()?,
            total_amount: model.total_amount,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl TryFrom<rentals::Model> for Rental {
    type Error = AppError;

    fn try_from(model: rentals::Model) -> Result<Self, Self::Error> {
        let rental_period = model
            .rental_period
            .parse()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("unknown rental period stored")))?;
        Ok(Rental {
            id: model.id,
            user_id: model.user_id,
            book_id: model.book_id,
            start_date: model.start_date.with_timezone(&Utc),
            end_date: model.end_date.with_timezone(&Utc),
            rental_period,
            is_returned: model.is_returned,
            reminder_sent: model.reminder_sent,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}
