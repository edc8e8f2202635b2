use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::parse_uuid;
use crate::db::DatabaseError;
use crate::models::*;

/// Italian codice fiscale, including omocodia substitutions in digit positions.
fn fiscal_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Z]{6}[0-9LMNPQRSTUV]{2}[A-EHLMPR-T][0-9LMNPQRSTUV]{2}[A-Z][0-9LMNPQRSTUV]{3}[A-Z]$",
        )
        .unwrap_or_else(|_| unreachable!("fiscal code pattern is a valid literal"))
    })
}

/// Normalize (trim + upper-case) and validate a fiscal code.
pub fn normalize_fiscal_code(raw: &str) -> Result<String, DatabaseError> {
    let normalized = raw.trim().to_uppercase();
    if !fiscal_code_pattern().is_match(&normalized) {
        return Err(DatabaseError::ConstraintViolation(
            "fiscal code is not a valid 16-character code".into(),
        ));
    }
    Ok(normalized)
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let fiscal_code = normalize_fiscal_code(&patient.fiscal_code)?;
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, fiscal_code, birth_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            fiscal_code,
            patient.birth_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, fiscal_code, birth_date FROM patients WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, first_name, last_name, fiscal_code, birth_date)| {
        Ok(Patient {
            id: parse_uuid(&id)?,
            first_name,
            last_name,
            fiscal_code,
            birth_date: birth_date.as_deref().map(parse_date).transpose()?,
        })
    })
    .transpose()
}

fn parse_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("invalid date '{value}': {e}")))
}

pub fn insert_professional(conn: &Connection, prof: &Professional) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO professionals (id, name, email, price_list_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            prof.id.to_string(),
            prof.name,
            prof.email,
            prof.price_list_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_professional(conn: &Connection, id: &Uuid) -> Result<Option<Professional>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, price_list_id FROM professionals WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, email, price_list_id)| {
        Ok(Professional {
            id: parse_uuid(&id)?,
            name,
            email,
            price_list_id: price_list_id.as_deref().map(parse_uuid).transpose()?,
        })
    })
    .transpose()
}

/// Assign (or clear) the price list a professional's orders resolve against.
pub fn assign_price_list(
    conn: &Connection,
    professional_id: &Uuid,
    price_list_id: Option<&Uuid>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE professionals SET price_list_id = ?2 WHERE id = ?1",
        params![professional_id.to_string(), price_list_id.map(|id| id.to_string())],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("Professional", professional_id));
    }
    Ok(())
}

pub fn insert_scientist(conn: &Connection, scientist: &Scientist) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO scientists (id, name, registration) VALUES (?1, ?2, ?3)",
        params![scientist.id.to_string(), scientist.name, scientist.registration],
    )?;
    Ok(())
}

pub fn get_scientist(conn: &Connection, id: &Uuid) -> Result<Option<Scientist>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, registration FROM scientists WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, registration)| {
        Ok(Scientist {
            id: parse_uuid(&id)?,
            name,
            registration,
        })
    })
    .transpose()
}
