use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Italian codice fiscale, stored upper-cased.
    pub fiscal_code: String,
    pub birth_date: Option<NaiveDate>,
}

/// Requesting professional; prices resolve through their price list, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub price_list_id: Option<Uuid>,
}

/// Lab scientist who issues reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scientist {
    pub id: Uuid,
    pub name: String,
    pub registration: Option<String>,
}
