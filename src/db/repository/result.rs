use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::Classification;
use crate::models::*;

pub fn insert_result(conn: &Connection, record: &ResultRecord) -> Result<(), DatabaseError> {
    let (assay_id, food_item_id) = match record.target {
        ResultTarget::Assay(id) => (Some(id.to_string()), None),
        ResultTarget::FoodItem(id) => (None, Some(id.to_string())),
    };
    conn.execute(
        "INSERT INTO result_records (id, order_id, assay_id, food_item_id, classification, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id.to_string(),
            record.order_id.to_string(),
            assay_id,
            food_item_id,
            record.classification.as_str(),
            record.note,
            format_timestamp(&record.created_at),
        ],
    )?;
    Ok(())
}

/// Result records of an order, in entry order.
pub fn get_results(conn: &Connection, order_id: &Uuid) -> Result<Vec<ResultRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, assay_id, food_item_id, classification, note, created_at
         FROM result_records WHERE order_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt
        .query_map(params![order_id.to_string()], |row| {
            Ok(ResultRow {
                id: row.get(0)?,
                order_id: row.get(1)?,
                assay_id: row.get(2)?,
                food_item_id: row.get(3)?,
                classification: row.get(4)?,
                note: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(result_from_row).collect()
}

pub fn count_results(conn: &Connection, order_id: &Uuid) -> Result<u32, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM result_records WHERE order_id = ?1",
        params![order_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for ResultRecord mapping
struct ResultRow {
    id: String,
    order_id: String,
    assay_id: Option<String>,
    food_item_id: Option<String>,
    classification: String,
    note: Option<String>,
    created_at: String,
}

fn result_from_row(row: ResultRow) -> Result<ResultRecord, DatabaseError> {
    let target = match (row.assay_id, row.food_item_id) {
        (Some(assay_id), None) => ResultTarget::Assay(parse_uuid(&assay_id)?),
        (None, Some(food_id)) => ResultTarget::FoodItem(parse_uuid(&food_id)?),
        _ => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "result {} must target exactly one of assay or food item",
                row.id
            )))
        }
    };
    Ok(ResultRecord {
        id: parse_uuid(&row.id)?,
        order_id: parse_uuid(&row.order_id)?,
        target,
        classification: Classification::from_str(&row.classification)?,
        note: row.note,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
