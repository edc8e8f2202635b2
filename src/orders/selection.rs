use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the professional asked for.
///
/// Genetic orders pick standalone assays and panels (each panel may carry
/// add-on assays billed individually). The other order types pick exactly
/// one element: a microbiome assay type or an intolerance panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Selection {
    Genetic {
        assays: Vec<Uuid>,
        panels: Vec<PanelSelection>,
    },
    Single { element_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSelection {
    pub panel_id: Uuid,
    #[serde(default)]
    pub add_ons: Vec<Uuid>,
}

impl Selection {
    pub fn genetic(assays: Vec<Uuid>, panels: Vec<PanelSelection>) -> Self {
        Self::Genetic { assays, panels }
    }

    pub fn single(element_id: Uuid) -> Self {
        Self::Single { element_id }
    }
}

impl PanelSelection {
    pub fn new(panel_id: Uuid) -> Self {
        Self { panel_id, add_ons: Vec::new() }
    }

    pub fn with_add_ons(panel_id: Uuid, add_ons: Vec<Uuid>) -> Self {
        Self { panel_id, add_ons }
    }
}
