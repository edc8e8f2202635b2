//! Result entry guard and completeness checks.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use super::kind::kind_of;
use super::{audit_entity, OrderError};
use crate::db::{self, DatabaseError};
use crate::models::enums::OrderStatus;
use crate::models::{NewResult, ResultRecord, ResultTarget};

/// Result targets a complete order must carry, in report order.
pub fn expected_results(conn: &Connection, order_id: &Uuid) -> Result<Vec<ResultTarget>, OrderError> {
    let order = db::get_order(conn, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    let detail = db::get_order_detail(conn, order_id)?
        .ok_or_else(|| DatabaseError::not_found("OrderDetail", order_id))?;
    let lines = db::get_line_items(conn, order_id)?;
    kind_of(order.order_type).expected_results(conn, &detail, &lines)
}

/// Expected targets that have no result record yet.
pub fn missing_results(conn: &Connection, order_id: &Uuid) -> Result<Vec<ResultTarget>, OrderError> {
    let recorded: HashSet<ResultTarget> = db::get_results(conn, order_id)?
        .into_iter()
        .map(|r| r.target)
        .collect();
    let mut expected = expected_results(conn, order_id)?;
    expected.retain(|target| !recorded.contains(target));
    Ok(expected)
}

/// Bulk-insert result records for an `executed` order.
///
/// Every target must belong to the order, assays take genotype outcomes
/// and food items take grades. Results are never rewritten: a second record
/// for the same target fails and rolls back the whole batch.
pub fn record_results(
    conn: &Connection,
    order_id: &Uuid,
    results: &[NewResult],
) -> Result<usize, OrderError> {
    let tx = conn.unchecked_transaction()?;
    let order = db::get_order(&tx, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    if order.status != OrderStatus::Executed {
        return Err(OrderError::ResultsLocked(order.status));
    }

    let expected: HashSet<ResultTarget> = expected_results(&tx, order_id)?.into_iter().collect();
    let now = Utc::now();
    for result in results {
        if !expected.contains(&result.target) {
            return Err(OrderError::InvalidResult(format!(
                "{:?} is not part of order {}",
                result.target, order.code
            )));
        }
        let graded_target = matches!(result.target, ResultTarget::FoodItem(_));
        if result.classification.is_graded() != graded_target {
            return Err(OrderError::InvalidResult(format!(
                "{} does not apply to {:?}",
                result.classification, result.target
            )));
        }
        db::insert_result(
            &tx,
            &ResultRecord {
                id: Uuid::new_v4(),
                order_id: *order_id,
                target: result.target,
                classification: result.classification,
                note: result.note.clone(),
                created_at: now,
            },
        )?;
    }

    db::insert_audit_entry(
        &tx,
        "results_recorded",
        &audit_entity(order_id),
        Some(&format!("{} count {}", order.code, results.len())),
    )?;
    tx.commit()?;

    tracing::info!(order_id = %order_id, count = results.len(), "Results recorded");
    Ok(results.len())
}
