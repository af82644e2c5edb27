use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BookSummary, OrderStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub book_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemWithBook {
    pub id: Uuid,
    pub order_id: Uuid,
    pub book_id: Uuid,
    pub quantity: i32,
    pub price: i64,
    pub book: BookSummary,
}

/// The caller's PENDING order. A user without one gets `id: null` and no items.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub total_amount: i64,
    pub order_items: Vec<OrderItemWithBook>,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            id: None,
            status: None,
            total_amount: 0,
            order_items: Vec::new(),
        }
    }
}
