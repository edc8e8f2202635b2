use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

pub fn insert_assay_group(conn: &Connection, group: &AssayGroup) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO assay_groups (id, name, display_order) VALUES (?1, ?2, ?3)",
        params![group.id.to_string(), group.name, group.display_order],
    )?;
    Ok(())
}

pub fn get_assay_group(conn: &Connection, id: &Uuid) -> Result<Option<AssayGroup>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, display_order FROM assay_groups WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, display_order)| {
        Ok(AssayGroup {
            id: parse_uuid(&id)?,
            name,
            display_order,
        })
    })
    .transpose()
}

pub fn insert_assay(conn: &Connection, assay: &Assay) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO assays (id, code, description, group_id, base_price_cents, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            assay.id.to_string(),
            assay.code,
            assay.description,
            assay.group_id.to_string(),
            assay.base_price.cents(),
            assay.active,
        ],
    )?;
    Ok(())
}

pub fn get_assay(conn: &Connection, id: &Uuid) -> Result<Option<Assay>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, description, group_id, base_price_cents, active
             FROM assays WHERE id = ?1",
            params![id.to_string()],
            assay_row_from_rusqlite,
        )
        .optional()?;
    row.map(assay_from_row).transpose()
}

pub fn update_assay_price(conn: &Connection, id: &Uuid, price: Money) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE assays SET base_price_cents = ?2 WHERE id = ?1",
        params![id.to_string(), price.cents()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Assay", id));
    }
    Ok(())
}

pub fn insert_panel(conn: &Connection, panel: &Panel, assay_ids: &[Uuid]) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO panels (id, code, name, base_price_cents, active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            panel.id.to_string(),
            panel.code,
            panel.name,
            panel.base_price.cents(),
            panel.active,
        ],
    )?;
    let mut stmt = conn.prepare("INSERT INTO panel_assays (panel_id, assay_id) VALUES (?1, ?2)")?;
    for assay_id in assay_ids {
        stmt.execute(params![panel.id.to_string(), assay_id.to_string()])?;
    }
    Ok(())
}

pub fn get_panel(conn: &Connection, id: &Uuid) -> Result<Option<Panel>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, name, base_price_cents, active FROM panels WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, code, name, cents, active)| {
        Ok(Panel {
            id: parse_uuid(&id)?,
            code,
            name,
            base_price: Money::from_cents(cents),
            active,
        })
    })
    .transpose()
}

/// Assays bundled in a panel, ordered by assay code.
pub fn get_panel_assay_ids(conn: &Connection, panel_id: &Uuid) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT pa.assay_id FROM panel_assays pa
         JOIN assays a ON a.id = pa.assay_id
         WHERE pa.panel_id = ?1 ORDER BY a.code",
    )?;
    let ids = stmt
        .query_map(params![panel_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    ids.iter().map(|id| parse_uuid(id)).collect()
}

pub fn insert_microbiome_assay_type(
    conn: &Connection,
    assay_type: &MicrobiomeAssayType,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO microbiome_assay_types (id, code, name, base_price_cents, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            assay_type.id.to_string(),
            assay_type.code,
            assay_type.name,
            assay_type.base_price.cents(),
            assay_type.active,
        ],
    )?;
    Ok(())
}

pub fn get_microbiome_assay_type(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MicrobiomeAssayType>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, name, base_price_cents, active FROM microbiome_assay_types WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, code, name, cents, active)| {
        Ok(MicrobiomeAssayType {
            id: parse_uuid(&id)?,
            code,
            name,
            base_price: Money::from_cents(cents),
            active,
        })
    })
    .transpose()
}

pub fn insert_food_item(conn: &Connection, item: &FoodItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO food_items (id, name) VALUES (?1, ?2)",
        params![item.id.to_string(), item.name],
    )?;
    Ok(())
}

pub fn get_food_item(conn: &Connection, id: &Uuid) -> Result<Option<FoodItem>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name FROM food_items WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    row.map(|(id, name)| Ok(FoodItem { id: parse_uuid(&id)?, name }))
        .transpose()
}

pub fn insert_intolerance_panel(
    conn: &Connection,
    panel: &IntolerancePanel,
    food_item_ids: &[Uuid],
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO intolerance_panels (id, code, name, method, base_price_cents, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            panel.id.to_string(),
            panel.code,
            panel.name,
            panel.method.as_str(),
            panel.base_price.cents(),
            panel.active,
        ],
    )?;
    let mut stmt = conn.prepare(
        "INSERT INTO intolerance_panel_foods (panel_id, food_item_id) VALUES (?1, ?2)",
    )?;
    for food_id in food_item_ids {
        stmt.execute(params![panel.id.to_string(), food_id.to_string()])?;
    }
    Ok(())
}

pub fn get_intolerance_panel(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<IntolerancePanel>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, code, name, method, base_price_cents, active
             FROM intolerance_panels WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, code, name, method, cents, active)| {
        Ok(IntolerancePanel {
            id: parse_uuid(&id)?,
            code,
            name,
            method: IntoleranceMethod::from_str(&method)?,
            base_price: Money::from_cents(cents),
            active,
        })
    })
    .transpose()
}

/// Food items tested by an intolerance panel, ordered by name.
pub fn get_intolerance_panel_foods(
    conn: &Connection,
    panel_id: &Uuid,
) -> Result<Vec<FoodItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.name FROM intolerance_panel_foods pf
         JOIN food_items f ON f.id = pf.food_item_id
         WHERE pf.panel_id = ?1 ORDER BY f.name",
    )?;
    let rows = stmt
        .query_map(params![panel_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name)| Ok(FoodItem { id: parse_uuid(&id)?, name }))
        .collect()
}

/// Catalog base price of an element, `None` when the element does not exist.
///
/// Soft-disabled elements keep their price: disabling only hides them from
/// new selections, it never changes what historical orders resolve to.
pub fn get_base_price(
    conn: &Connection,
    category: PriceCategory,
    element_id: &Uuid,
) -> Result<Option<Money>, DatabaseError> {
    let (sql, method) = match category {
        PriceCategory::Assay => ("SELECT base_price_cents FROM assays WHERE id = ?1", None),
        PriceCategory::Panel => ("SELECT base_price_cents FROM panels WHERE id = ?1", None),
        PriceCategory::MicrobiomeAssayType => (
            "SELECT base_price_cents FROM microbiome_assay_types WHERE id = ?1",
            None,
        ),
        PriceCategory::IntoleranceCytotoxic => (
            "SELECT base_price_cents FROM intolerance_panels WHERE id = ?1 AND method = ?2",
            Some(IntoleranceMethod::Cytotoxic),
        ),
        PriceCategory::IntoleranceImmunoassay => (
            "SELECT base_price_cents FROM intolerance_panels WHERE id = ?1 AND method = ?2",
            Some(IntoleranceMethod::Immunoassay),
        ),
    };

    let cents = match method {
        Some(method) => conn
            .query_row(sql, params![element_id.to_string(), method.as_str()], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?,
        None => conn
            .query_row(sql, params![element_id.to_string()], |row| row.get::<_, i64>(0))
            .optional()?,
    };
    Ok(cents.map(Money::from_cents))
}

/// Soft-enable or soft-disable a catalog element.
pub fn set_element_active(
    conn: &Connection,
    category: PriceCategory,
    element_id: &Uuid,
    active: bool,
) -> Result<(), DatabaseError> {
    let table = catalog_table(category);
    let updated = conn.execute(
        &format!("UPDATE {table} SET active = ?2 WHERE id = ?1"),
        params![element_id.to_string(), active],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found(category.as_str(), element_id));
    }
    tracing::info!(category = %category, element_id = %element_id, active, "Catalog element toggled");
    Ok(())
}

/// Active flag of an element, `None` when the element does not exist.
pub fn element_active(
    conn: &Connection,
    category: PriceCategory,
    element_id: &Uuid,
) -> Result<Option<bool>, DatabaseError> {
    let table = catalog_table(category);
    let active = conn
        .query_row(
            &format!("SELECT active FROM {table} WHERE id = ?1"),
            params![element_id.to_string()],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(active)
}

fn catalog_table(category: PriceCategory) -> &'static str {
    match category {
        PriceCategory::Assay => "assays",
        PriceCategory::Panel => "panels",
        PriceCategory::MicrobiomeAssayType => "microbiome_assay_types",
        PriceCategory::IntoleranceCytotoxic | PriceCategory::IntoleranceImmunoassay => {
            "intolerance_panels"
        }
    }
}

// Internal row type for Assay mapping
struct AssayRow {
    id: String,
    code: String,
    description: String,
    group_id: String,
    base_price_cents: i64,
    active: bool,
}

fn assay_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AssayRow, rusqlite::Error> {
    Ok(AssayRow {
        id: row.get(0)?,
        code: row.get(1)?,
        description: row.get(2)?,
        group_id: row.get(3)?,
        base_price_cents: row.get(4)?,
        active: row.get(5)?,
    })
}

fn assay_from_row(row: AssayRow) -> Result<Assay, DatabaseError> {
    Ok(Assay {
        id: parse_uuid(&row.id)?,
        code: row.code,
        description: row.description,
        group_id: parse_uuid(&row.group_id)?,
        base_price: Money::from_cents(row.base_price_cents),
        active: row.active,
    })
}
