use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{BookSummary, Rental, UserSummary};

#[derive(Debug, Serialize, ToSchema)]
pub struct Stats {
    pub total_books: u64,
    pub total_users: u64,
    pub active_rentals: u64,
    pub orders_this_month: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReminderSummary {
    pub success: bool,
    pub upcoming: usize,
    pub overdue: usize,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminRental {
    pub rental: Rental,
    pub book: BookSummary,
    pub user: UserSummary,
    pub is_overdue: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminRentalList {
    #[schema(value_type = Vec<AdminRental>)]
    pub items: Vec<AdminRental>,
}
