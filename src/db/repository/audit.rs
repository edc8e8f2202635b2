use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// One row of the audit trail. `detail` carries opaque identifiers and
/// enum values only, never patient data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub action: String,
    pub entity: String,
    pub detail: Option<String>,
}

/// Append an audit entry, e.g. `("status_advanced", "order:<uuid>", "requested->in_progress")`.
pub fn insert_audit_entry(
    conn: &Connection,
    action: &str,
    entity: &str,
    detail: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (action, entity, detail) VALUES (?1, ?2, ?3)",
        params![action, entity, detail],
    )?;
    Ok(())
}

/// Audit entries of one entity, in insertion order.
pub fn query_audit_by_entity(conn: &Connection, entity: &str) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, action, entity, detail FROM audit_log
         WHERE entity = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![entity], |row| {
            Ok(AuditEntry {
                timestamp: row.get(0)?,
                action: row.get(1)?,
                entity: row.get(2)?,
                detail: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
