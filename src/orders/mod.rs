//! Order lifecycle: creation and composition, status advances, price
//! corrections and result entry.

pub mod composer;
pub mod kind;
pub mod results;
pub mod selection;
pub mod service;
pub mod state_machine;

pub use composer::compose;
pub use kind::{kind_of, LineSink, OrderKind};
pub use results::{expected_results, missing_results, record_results};
pub use selection::{PanelSelection, Selection};
pub use service::{apply_discount, create_order, NewOrder};
pub use state_machine::advance;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::OrderStatus;
use crate::pricing::PricingError;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {order_id} cannot reach {status} without its report artifact")]
    ArtifactRequired { order_id: Uuid, status: OrderStatus },

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Results are read-only while the order is {0}")]
    ResultsLocked(OrderStatus),

    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Price resolution failed: {0}")]
    Pricing(#[from] PricingError),
}

impl From<rusqlite::Error> for OrderError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(DatabaseError::from(err))
    }
}

/// Audit entity key of an order.
pub(crate) fn audit_entity(order_id: &Uuid) -> String {
    format!("order:{order_id}")
}
