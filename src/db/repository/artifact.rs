use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_artifact(conn: &Connection, artifact: &ReportArtifact) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO report_artifacts (id, order_id, path, content_hash, scientist_id,
         created_at, signed_path, signed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            artifact.id.to_string(),
            artifact.order_id.to_string(),
            artifact.path,
            artifact.content_hash,
            artifact.scientist_id.to_string(),
            format_timestamp(&artifact.created_at),
            artifact.signed_path,
            artifact.signed_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_artifact_by_order(
    conn: &Connection,
    order_id: &Uuid,
) -> Result<Option<ReportArtifact>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, order_id, path, content_hash, scientist_id, created_at, signed_path, signed_at
             FROM report_artifacts WHERE order_id = ?1",
            params![order_id.to_string()],
            |row| {
                Ok(ArtifactRow {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    path: row.get(2)?,
                    content_hash: row.get(3)?,
                    scientist_id: row.get(4)?,
                    created_at: row.get(5)?,
                    signed_path: row.get(6)?,
                    signed_at: row.get(7)?,
                })
            },
        )
        .optional()?;
    row.map(artifact_from_row).transpose()
}

/// Record the signed variant. Only an unsigned artifact can be marked, so a
/// second signing attempt leaves the first one untouched and returns `false`.
pub fn mark_artifact_signed(
    conn: &Connection,
    order_id: &Uuid,
    signed_path: &str,
    signed_at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE report_artifacts SET signed_path = ?2, signed_at = ?3
         WHERE order_id = ?1 AND signed_path IS NULL",
        params![order_id.to_string(), signed_path, format_timestamp(signed_at)],
    )?;
    Ok(updated == 1)
}

/// Insert or replace the external document of an order.
pub fn upsert_external_document(conn: &Connection, doc: &ExternalDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO external_documents (order_id, path, content_hash, uploaded_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (order_id) DO UPDATE SET
           path = excluded.path,
           content_hash = excluded.content_hash,
           uploaded_at = excluded.uploaded_at",
        params![
            doc.order_id.to_string(),
            doc.path,
            doc.content_hash,
            format_timestamp(&doc.uploaded_at),
        ],
    )?;
    Ok(())
}

pub fn get_external_document(
    conn: &Connection,
    order_id: &Uuid,
) -> Result<Option<ExternalDocument>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT order_id, path, content_hash, uploaded_at FROM external_documents WHERE order_id = ?1",
            params![order_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(order_id, path, content_hash, uploaded_at)| {
        Ok(ExternalDocument {
            order_id: parse_uuid(&order_id)?,
            path,
            content_hash,
            uploaded_at: parse_timestamp(&uploaded_at)?,
        })
    })
    .transpose()
}

// Internal row type for ReportArtifact mapping
struct ArtifactRow {
    id: String,
    order_id: String,
    path: String,
    content_hash: String,
    scientist_id: String,
    created_at: String,
    signed_path: Option<String>,
    signed_at: Option<String>,
}

fn artifact_from_row(row: ArtifactRow) -> Result<ReportArtifact, DatabaseError> {
    Ok(ReportArtifact {
        id: parse_uuid(&row.id)?,
        order_id: parse_uuid(&row.order_id)?,
        path: row.path,
        content_hash: row.content_hash,
        scientist_id: parse_uuid(&row.scientist_id)?,
        created_at: parse_timestamp(&row.created_at)?,
        signed_path: row.signed_path,
        signed_at: parse_optional_timestamp(row.signed_at)?,
    })
}
