use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{LineItemKind, OrderStatus, OrderType, PriceCategory};
use super::money::{Discount, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub code: String,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub base_price: Money,
    pub discount: Option<Discount>,
    pub final_price: Money,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub reported_at: Option<DateTime<Utc>>,
}

/// The order-type-specific detail record. Genetic orders carry their
/// selection in line items only, so `element_id` is `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_id: Uuid,
    pub order_type: OrderType,
    pub element_id: Option<Uuid>,
}

/// A priced component of an order. `unit_price` is frozen at composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub parent_line_id: Option<Uuid>,
    pub kind: LineItemKind,
    pub category: PriceCategory,
    pub element_id: Uuid,
    pub unit_price: Money,
    pub position: i64,
}
