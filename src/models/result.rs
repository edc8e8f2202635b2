use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Classification;

/// What a result record classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ResultTarget {
    Assay(Uuid),
    FoodItem(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub target: ResultTarget,
    pub classification: Classification,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input of the result-entry workflow.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub target: ResultTarget,
    pub classification: Classification,
    pub note: Option<String>,
}
