//! Order creation and price corrections.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::composer::compose_in;
use super::selection::Selection;
use super::{audit_entity, OrderError};
use crate::db;
use crate::models::enums::{OrderStatus, OrderType};
use crate::models::{final_price, Discount, Money, Order};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub order_type: OrderType,
    pub selection: Selection,
    pub discount: Option<Discount>,
}

/// Human-readable order code, e.g. `GEN-20260301-0007`.
pub fn order_code(order_type: OrderType, day: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{sequence:04}", order_type.code_prefix(), day.format("%Y%m%d"))
}

/// Create an order with its code, detail row and priced line items.
///
/// Runs in one immediate transaction: a concurrent creation waits for the
/// day's sequence instead of reusing it, and no reader ever sees an order
/// without its lines.
pub fn create_order(conn: &Connection, new: &NewOrder) -> Result<Order, OrderError> {
    let now = Utc::now();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let sequence = db::next_order_sequence(&tx, now.date_naive())?;
    let order = Order {
        id: Uuid::new_v4(),
        code: order_code(new.order_type, now.date_naive(), sequence),
        patient_id: new.patient_id,
        professional_id: new.professional_id,
        order_type: new.order_type,
        status: OrderStatus::Requested,
        base_price: Money::ZERO,
        discount: new.discount,
        final_price: Money::ZERO,
        created_at: now,
        executed_at: None,
        reported_at: None,
    };
    db::insert_order(&tx, &order)?;
    compose_in(&tx, &order.id, new.order_type, &new.selection)?;
    db::insert_audit_entry(&tx, "order_created", &audit_entity(&order.id), Some(&order.code))?;

    let created = db::get_order(&tx, &order.id)?.ok_or(OrderError::NotFound(order.id))?;
    tx.commit()?;

    tracing::info!(order_id = %created.id, code = %created.code, "Order created");
    Ok(created)
}

/// Set or clear the discount and recompute the final price from the
/// frozen base price.
pub fn apply_discount(
    conn: &Connection,
    order_id: &Uuid,
    discount: Option<Discount>,
) -> Result<Order, OrderError> {
    let tx = conn.unchecked_transaction()?;
    let order = db::get_order(&tx, order_id)?.ok_or(OrderError::NotFound(*order_id))?;

    let final_amount = final_price(order.base_price, discount);
    db::update_order_prices(&tx, order_id, order.base_price, discount, final_amount)?;
    let detail = match discount {
        Some(d) => format!("discount {d} final {final_amount}"),
        None => format!("discount cleared final {final_amount}"),
    };
    db::insert_audit_entry(&tx, "price_corrected", &audit_entity(order_id), Some(&detail))?;

    let updated = db::get_order(&tx, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    tx.commit()?;

    tracing::info!(order_id = %order_id, final_price = %final_amount, "Order price corrected");
    Ok(updated)
}
