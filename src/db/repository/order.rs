use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

const ORDER_COLUMNS: &str = "id, code, patient_id, professional_id, order_type, status,
     base_price_cents, discount_bps, final_price_cents, created_at, executed_at, reported_at";

pub fn insert_order(conn: &Connection, order: &Order) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO orders (id, code, patient_id, professional_id, order_type, status,
         base_price_cents, discount_bps, final_price_cents, created_at, executed_at, reported_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            order.id.to_string(),
            order.code,
            order.patient_id.to_string(),
            order.professional_id.to_string(),
            order.order_type.as_str(),
            order.status.as_str(),
            order.base_price.cents(),
            order.discount.map(|d| d.bps()),
            order.final_price.cents(),
            format_timestamp(&order.created_at),
            order.executed_at.as_ref().map(format_timestamp),
            order.reported_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_order(conn: &Connection, id: &Uuid) -> Result<Option<Order>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
            params![id.to_string()],
            order_row_from_rusqlite,
        )
        .optional()?;
    row.map(order_from_row).transpose()
}

pub fn get_order_by_code(conn: &Connection, code: &str) -> Result<Option<Order>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE code = ?1"),
            params![code],
            order_row_from_rusqlite,
        )
        .optional()?;
    row.map(order_from_row).transpose()
}

/// Orders in a status, oldest first.
pub fn list_orders_by_status(
    conn: &Connection,
    status: OrderStatus,
) -> Result<Vec<Order>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at, code"
    ))?;
    let rows = stmt
        .query_map(params![status.as_str()], order_row_from_rusqlite)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(order_from_row).collect()
}

pub fn get_order_status(conn: &Connection, id: &Uuid) -> Result<Option<OrderStatus>, DatabaseError> {
    let status = conn
        .query_row(
            "SELECT status FROM orders WHERE id = ?1",
            params![id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    status.as_deref().map(OrderStatus::from_str).transpose()
}

pub fn update_order_prices(
    conn: &Connection,
    id: &Uuid,
    base_price: Money,
    discount: Option<Discount>,
    final_price: Money,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE orders SET base_price_cents = ?2, discount_bps = ?3, final_price_cents = ?4
         WHERE id = ?1",
        params![
            id.to_string(),
            base_price.cents(),
            discount.map(|d| d.bps()),
            final_price.cents(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Order", id));
    }
    Ok(())
}

/// Move an order from `expected` to `target` only if it is still in
/// `expected`. Returns `false` when another writer got there first.
///
/// `Executed` stamps `executed_at` and `Reported` stamps `reported_at`.
pub fn compare_and_set_status(
    conn: &Connection,
    id: &Uuid,
    expected: OrderStatus,
    target: OrderStatus,
    at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let stamp_column = match target {
        OrderStatus::Executed => Some("executed_at"),
        OrderStatus::Reported => Some("reported_at"),
        _ => None,
    };
    let updated = match stamp_column {
        Some(column) => conn.execute(
            &format!("UPDATE orders SET status = ?3, {column} = ?4 WHERE id = ?1 AND status = ?2"),
            params![
                id.to_string(),
                expected.as_str(),
                target.as_str(),
                format_timestamp(at),
            ],
        )?,
        None => conn.execute(
            "UPDATE orders SET status = ?3 WHERE id = ?1 AND status = ?2",
            params![id.to_string(), expected.as_str(), target.as_str()],
        )?,
    };
    Ok(updated == 1)
}

/// Next value of the per-day order sequence, starting at 1.
///
/// Must run inside the transaction that inserts the order so that two
/// concurrent creations never share a code.
pub fn next_order_sequence(conn: &Connection, day: NaiveDate) -> Result<u32, DatabaseError> {
    let day = day.format("%Y%m%d").to_string();
    let value = conn.query_row(
        "INSERT INTO order_code_sequence (day, last_value) VALUES (?1, 1)
         ON CONFLICT (day) DO UPDATE SET last_value = last_value + 1
         RETURNING last_value",
        params![day],
        |row| row.get::<_, i64>(0),
    )?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::ConstraintViolation(format!("order sequence overflow on {day}")))
}

pub fn insert_order_detail(conn: &Connection, detail: &OrderDetail) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO order_details (order_id, order_type, element_id) VALUES (?1, ?2, ?3)",
        params![
            detail.order_id.to_string(),
            detail.order_type.as_str(),
            detail.element_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_order_detail(conn: &Connection, order_id: &Uuid) -> Result<Option<OrderDetail>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT order_id, order_type, element_id FROM order_details WHERE order_id = ?1",
            params![order_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(order_id, order_type, element_id)| {
        Ok(OrderDetail {
            order_id: parse_uuid(&order_id)?,
            order_type: OrderType::from_str(&order_type)?,
            element_id: element_id.as_deref().map(parse_uuid).transpose()?,
        })
    })
    .transpose()
}

// Internal row type for Order mapping
struct OrderRow {
    id: String,
    code: String,
    patient_id: String,
    professional_id: String,
    order_type: String,
    status: String,
    base_price_cents: i64,
    discount_bps: Option<u32>,
    final_price_cents: i64,
    created_at: String,
    executed_at: Option<String>,
    reported_at: Option<String>,
}

fn order_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<OrderRow, rusqlite::Error> {
    Ok(OrderRow {
        id: row.get(0)?,
        code: row.get(1)?,
        patient_id: row.get(2)?,
        professional_id: row.get(3)?,
        order_type: row.get(4)?,
        status: row.get(5)?,
        base_price_cents: row.get(6)?,
        discount_bps: row.get(7)?,
        final_price_cents: row.get(8)?,
        created_at: row.get(9)?,
        executed_at: row.get(10)?,
        reported_at: row.get(11)?,
    })
}

fn order_from_row(row: OrderRow) -> Result<Order, DatabaseError> {
    let discount = row
        .discount_bps
        .map(|bps| {
            Discount::from_bps(bps).ok_or_else(|| {
                DatabaseError::ConstraintViolation(format!("discount out of range: {bps}"))
            })
        })
        .transpose()?;

    Ok(Order {
        id: parse_uuid(&row.id)?,
        code: row.code,
        patient_id: parse_uuid(&row.patient_id)?,
        professional_id: parse_uuid(&row.professional_id)?,
        order_type: OrderType::from_str(&row.order_type)?,
        status: OrderStatus::from_str(&row.status)?,
        base_price: Money::from_cents(row.base_price_cents),
        discount,
        final_price: Money::from_cents(row.final_price_cents),
        created_at: parse_timestamp(&row.created_at)?,
        executed_at: parse_optional_timestamp(row.executed_at)?,
        reported_at: parse_optional_timestamp(row.reported_at)?,
    })
}
