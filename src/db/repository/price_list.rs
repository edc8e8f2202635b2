use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::PriceCategory;
use crate::models::*;

pub fn insert_price_list(conn: &Connection, list: &PriceList) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO price_lists (id, name, active) VALUES (?1, ?2, ?3)",
        params![list.id.to_string(), list.name, list.active],
    )?;
    Ok(())
}

pub fn get_price_list(conn: &Connection, id: &Uuid) -> Result<Option<PriceList>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, active FROM price_lists WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, active)| {
        Ok(PriceList {
            id: parse_uuid(&id)?,
            name,
            active,
        })
    })
    .transpose()
}

/// Soft-disable a price list. Its entries stop applying to new resolutions.
pub fn set_price_list_active(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE price_lists SET active = ?2 WHERE id = ?1",
        params![id.to_string(), active],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("PriceList", id));
    }
    Ok(())
}

/// Insert or replace the override price of one element.
pub fn upsert_price_list_entry(conn: &Connection, entry: &PriceListEntry) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO price_list_entries (price_list_id, category, element_id, price_cents)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (price_list_id, category, element_id)
         DO UPDATE SET price_cents = excluded.price_cents",
        params![
            entry.price_list_id.to_string(),
            entry.category.as_str(),
            entry.element_id.to_string(),
            entry.price.cents(),
        ],
    )?;
    Ok(())
}

pub fn delete_price_list_entry(
    conn: &Connection,
    price_list_id: &Uuid,
    category: PriceCategory,
    element_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM price_list_entries
         WHERE price_list_id = ?1 AND category = ?2 AND element_id = ?3",
        params![price_list_id.to_string(), category.as_str(), element_id.to_string()],
    )?;
    Ok(deleted > 0)
}

/// Override price from an active price list, `None` when there is no entry
/// or the list is disabled.
pub fn get_price_list_price(
    conn: &Connection,
    price_list_id: &Uuid,
    category: PriceCategory,
    element_id: &Uuid,
) -> Result<Option<Money>, DatabaseError> {
    let cents = conn
        .query_row(
            "SELECT e.price_cents FROM price_list_entries e
             JOIN price_lists l ON l.id = e.price_list_id
             WHERE e.price_list_id = ?1 AND e.category = ?2 AND e.element_id = ?3
               AND l.active = 1",
            params![price_list_id.to_string(), category.as_str(), element_id.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(cents.map(Money::from_cents))
}

pub fn get_price_list_entries(
    conn: &Connection,
    price_list_id: &Uuid,
) -> Result<Vec<PriceListEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT price_list_id, category, element_id, price_cents FROM price_list_entries
         WHERE price_list_id = ?1 ORDER BY category, element_id",
    )?;
    let rows = stmt
        .query_map(params![price_list_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(list_id, category, element_id, cents)| {
            Ok(PriceListEntry {
                price_list_id: parse_uuid(&list_id)?,
                category: PriceCategory::from_str(&category)?,
                element_id: parse_uuid(&element_id)?,
                price: Money::from_cents(cents),
            })
        })
        .collect()
}
