//! Repository layer: entity-scoped database operations.
//!
//! Functions take a `&Connection` so callers decide the transaction
//! boundary; a `rusqlite::Transaction` derefs to one.

mod artifact;
mod audit;
mod catalog;
mod line_item;
mod order;
mod party;
mod price_list;
mod result;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use artifact::*;
pub use audit::*;
pub use catalog::*;
pub use line_item::*;
pub use order::*;
pub use party::*;
pub use price_list::*;
pub use result::*;

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that
/// lexical comparison in SQL matches chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    value.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
