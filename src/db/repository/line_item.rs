use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_line_item(conn: &Connection, item: &LineItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO order_line_items (id, order_id, parent_line_id, kind, category,
         element_id, unit_price_cents, position)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            item.id.to_string(),
            item.order_id.to_string(),
            item.parent_line_id.map(|id| id.to_string()),
            item.kind.as_str(),
            item.category.as_str(),
            item.element_id.to_string(),
            item.unit_price.cents(),
            item.position,
        ],
    )?;
    Ok(())
}

/// Line items of an order in composition order.
pub fn get_line_items(conn: &Connection, order_id: &Uuid) -> Result<Vec<LineItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, parent_line_id, kind, category, element_id, unit_price_cents, position
         FROM order_line_items WHERE order_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![order_id.to_string()], |row| {
            Ok(LineItemRow {
                id: row.get(0)?,
                order_id: row.get(1)?,
                parent_line_id: row.get(2)?,
                kind: row.get(3)?,
                category: row.get(4)?,
                element_id: row.get(5)?,
                unit_price_cents: row.get(6)?,
                position: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(line_item_from_row).collect()
}

pub fn count_line_items(conn: &Connection, order_id: &Uuid) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM order_line_items WHERE order_id = ?1",
        params![order_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for LineItem mapping
struct LineItemRow {
    id: String,
    order_id: String,
    parent_line_id: Option<String>,
    kind: String,
    category: String,
    element_id: String,
    unit_price_cents: i64,
    position: i64,
}

fn line_item_from_row(row: LineItemRow) -> Result<LineItem, DatabaseError> {
    Ok(LineItem {
        id: parse_uuid(&row.id)?,
        order_id: parse_uuid(&row.order_id)?,
        parent_line_id: row.parent_line_id.as_deref().map(parse_uuid).transpose()?,
        kind: LineItemKind::from_str(&row.kind)?,
        category: PriceCategory::from_str(&row.category)?,
        element_id: parse_uuid(&row.element_id)?,
        unit_price: Money::from_cents(row.unit_price_cents),
        position: row.position,
    })
}
