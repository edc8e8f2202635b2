use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{IntoleranceMethod, PriceCategory};
use super::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssayGroup {
    pub id: Uuid,
    pub name: String,
    pub display_order: i64,
}

/// A single genetic assay (one gene or variant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assay {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    pub group_id: Uuid,
    pub base_price: Money,
    pub active: bool,
}

/// A bundled set of assays sold at one price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_price: Money,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicrobiomeAssayType {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_price: Money,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntolerancePanel {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub method: IntoleranceMethod,
    pub base_price: Money,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceList {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceListEntry {
    pub price_list_id: Uuid,
    pub category: PriceCategory,
    pub element_id: Uuid,
    pub price: Money,
}
