//! Order State Machine: `requested → in_progress → executed → reported → signed`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use super::{audit_entity, OrderError};
use crate::db;
use crate::models::enums::OrderStatus;
use crate::models::Order;

/// Fail unless `target` is the single legal successor of `current`.
pub fn check_transition(current: OrderStatus, target: OrderStatus) -> Result<(), OrderError> {
    if current.can_advance_to(target) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition {
            from: current,
            to: target,
        })
    }
}

/// Advance an order to `target` in its own immediate transaction.
///
/// Two concurrent callers serialize on the database write lock; the second
/// one re-reads the committed status and fails with `InvalidTransition`.
pub fn advance(conn: &Connection, order_id: &Uuid, target: OrderStatus) -> Result<Order, OrderError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    advance_in(&tx, order_id, target, &Utc::now())?;
    let order = db::get_order(&tx, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    tx.commit()?;
    Ok(order)
}

/// Transition body. The caller owns the transaction.
///
/// `reported` and `signed` additionally require the unsigned and signed
/// artifact respectively, so the status never runs ahead of the files.
pub(crate) fn advance_in(
    conn: &Connection,
    order_id: &Uuid,
    target: OrderStatus,
    at: &DateTime<Utc>,
) -> Result<(), OrderError> {
    let order = db::get_order(conn, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    check_transition(order.status, target)?;

    let artifact_ready = match target {
        OrderStatus::Reported => db::get_artifact_by_order(conn, order_id)?.is_some(),
        OrderStatus::Signed => db::get_artifact_by_order(conn, order_id)?
            .is_some_and(|artifact| artifact.is_signed()),
        _ => true,
    };
    if !artifact_ready {
        return Err(OrderError::ArtifactRequired {
            order_id: *order_id,
            status: target,
        });
    }

    if !db::compare_and_set_status(conn, order_id, order.status, target, at)? {
        let current = db::get_order_status(conn, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
        tracing::warn!(order_id = %order_id, current = %current, target = %target, "Lost status race");
        return Err(OrderError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    db::insert_audit_entry(
        conn,
        "status_advanced",
        &audit_entity(order_id),
        Some(&format!("{} {}->{}", order.code, order.status, target)),
    )?;
    tracing::info!(
        order_id = %order_id,
        code = %order.code,
        from = %order.status,
        to = %target,
        "Order status advanced"
    );
    Ok(())
}
