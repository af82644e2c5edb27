use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BookSummary, Rental};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRentalRequest {
    pub book_id: Option<Uuid>,
    /// One of `TWO_WEEKS`, `ONE_MONTH`, `THREE_MONTHS`.
    pub rental_period: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RentalWithBook {
    pub rental: Rental,
    pub book: BookSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RentalList {
    #[schema(value_type = Vec<RentalWithBook>)]
    pub items: Vec<RentalWithBook>,
}
