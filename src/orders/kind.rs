//! Per-order-type capabilities.
//!
//! Each order type implements [`OrderKind`] once; composition and result
//! completeness dispatch through [`kind_of`] instead of branching on the
//! type at every call site.

use rusqlite::Connection;
use uuid::Uuid;

use super::selection::Selection;
use super::OrderError;
use crate::db;
use crate::models::enums::{IntoleranceMethod, LineItemKind, OrderType, PriceCategory};
use crate::models::{LineItem, OrderDetail, ResultTarget};

/// Receives the priced lines of a composition. Returns the id of the
/// persisted line so add-ons can reference their panel.
pub trait LineSink {
    fn push(
        &mut self,
        kind: LineItemKind,
        category: PriceCategory,
        element_id: Uuid,
        parent_line_id: Option<Uuid>,
    ) -> Result<Uuid, OrderError>;
}

pub trait OrderKind: Sync {
    fn order_type(&self) -> OrderType;

    /// Element recorded on the order's detail row. Single-element orders
    /// need it to exist in the catalog under their own category.
    fn detail_element(&self, conn: &Connection, selection: &Selection) -> Result<Option<Uuid>, OrderError>;

    /// Emit the line items of `selection`, in billing order.
    fn compose(&self, selection: &Selection, lines: &mut dyn LineSink) -> Result<(), OrderError>;

    /// Result records a complete order must carry, in report order.
    fn expected_results(
        &self,
        conn: &Connection,
        detail: &OrderDetail,
        lines: &[LineItem],
    ) -> Result<Vec<ResultTarget>, OrderError>;
}

static GENETIC: GeneticOrder = GeneticOrder;
static MICROBIOME: MicrobiomeOrder = MicrobiomeOrder;
static CYTOTOXIC: IntoleranceOrder = IntoleranceOrder {
    method: IntoleranceMethod::Cytotoxic,
};
static IMMUNOASSAY: IntoleranceOrder = IntoleranceOrder {
    method: IntoleranceMethod::Immunoassay,
};

pub fn kind_of(order_type: OrderType) -> &'static dyn OrderKind {
    match order_type {
        OrderType::Genetic => &GENETIC,
        OrderType::Microbiome => &MICROBIOME,
        OrderType::IntoleranceCytotoxic => &CYTOTOXIC,
        OrderType::IntoleranceImmunoassay => &IMMUNOASSAY,
    }
}

fn shape_mismatch(order_type: OrderType) -> OrderError {
    let expected = match order_type {
        OrderType::Genetic => "assays and panels",
        _ => "a single element",
    };
    OrderError::InvalidSelection(format!("{order_type} orders take {expected}"))
}

fn not_in_catalog(what: &str, id: &Uuid) -> OrderError {
    OrderError::InvalidSelection(format!("{what} {id} is not in the catalog"))
}

fn single_element(order_type: OrderType, selection: &Selection) -> Result<Uuid, OrderError> {
    match selection {
        Selection::Single { element_id } => Ok(*element_id),
        Selection::Genetic { .. } => Err(shape_mismatch(order_type)),
    }
}

fn compose_single(
    order_type: OrderType,
    selection: &Selection,
    lines: &mut dyn LineSink,
) -> Result<(), OrderError> {
    let element_id = single_element(order_type, selection)?;
    let category = order_type
        .single_element_category()
        .ok_or_else(|| shape_mismatch(order_type))?;
    lines.push(LineItemKind::Single, category, element_id, None)?;
    Ok(())
}

struct GeneticOrder;

impl OrderKind for GeneticOrder {
    fn order_type(&self) -> OrderType {
        OrderType::Genetic
    }

    fn detail_element(&self, _conn: &Connection, selection: &Selection) -> Result<Option<Uuid>, OrderError> {
        match selection {
            Selection::Genetic { .. } => Ok(None),
            Selection::Single { .. } => Err(shape_mismatch(OrderType::Genetic)),
        }
    }

    fn compose(&self, selection: &Selection, lines: &mut dyn LineSink) -> Result<(), OrderError> {
        let Selection::Genetic { assays, panels } = selection else {
            return Err(shape_mismatch(OrderType::Genetic));
        };
        if assays.is_empty() && panels.is_empty() {
            return Err(OrderError::InvalidSelection(
                "a genetic order needs at least one assay or panel".into(),
            ));
        }

        for assay_id in assays {
            lines.push(LineItemKind::Assay, PriceCategory::Assay, *assay_id, None)?;
        }
        for panel in panels {
            let panel_line = lines.push(LineItemKind::Panel, PriceCategory::Panel, panel.panel_id, None)?;
            for add_on in &panel.add_ons {
                lines.push(LineItemKind::AddOn, PriceCategory::Assay, *add_on, Some(panel_line))?;
            }
        }
        Ok(())
    }

    /// Standalone assays, add-ons and the member assays of every panel,
    /// each assay once. Zero-priced placeholders missing from the catalog
    /// carry no result.
    fn expected_results(
        &self,
        conn: &Connection,
        _detail: &OrderDetail,
        lines: &[LineItem],
    ) -> Result<Vec<ResultTarget>, OrderError> {
        let mut assays: Vec<Uuid> = Vec::new();
        for line in lines {
            match line.kind {
                LineItemKind::Assay | LineItemKind::AddOn => assays.push(line.element_id),
                LineItemKind::Panel => assays.extend(db::get_panel_assay_ids(conn, &line.element_id)?),
                LineItemKind::Single => {}
            }
        }
        let mut seen = std::collections::HashSet::new();
        assays.retain(|id| seen.insert(*id));

        let mut expected = Vec::with_capacity(assays.len());
        for assay_id in assays {
            if db::get_assay(conn, &assay_id)?.is_some() {
                expected.push(ResultTarget::Assay(assay_id));
            }
        }
        Ok(expected)
    }
}

/// Microbiome results arrive as an uploaded document, not as records.
struct MicrobiomeOrder;

impl OrderKind for MicrobiomeOrder {
    fn order_type(&self) -> OrderType {
        OrderType::Microbiome
    }

    fn detail_element(&self, conn: &Connection, selection: &Selection) -> Result<Option<Uuid>, OrderError> {
        let type_id = single_element(OrderType::Microbiome, selection)?;
        if db::get_microbiome_assay_type(conn, &type_id)?.is_none() {
            return Err(not_in_catalog("microbiome assay type", &type_id));
        }
        Ok(Some(type_id))
    }

    fn compose(&self, selection: &Selection, lines: &mut dyn LineSink) -> Result<(), OrderError> {
        compose_single(OrderType::Microbiome, selection, lines)
    }

    fn expected_results(
        &self,
        _conn: &Connection,
        _detail: &OrderDetail,
        _lines: &[LineItem],
    ) -> Result<Vec<ResultTarget>, OrderError> {
        Ok(Vec::new())
    }
}

struct IntoleranceOrder {
    method: IntoleranceMethod,
}

impl OrderKind for IntoleranceOrder {
    fn order_type(&self) -> OrderType {
        self.method.order_type()
    }

    fn detail_element(&self, conn: &Connection, selection: &Selection) -> Result<Option<Uuid>, OrderError> {
        let panel_id = single_element(self.order_type(), selection)?;
        let panel = db::get_intolerance_panel(conn, &panel_id)?
            .ok_or_else(|| not_in_catalog("intolerance panel", &panel_id))?;
        if panel.method != self.method {
            return Err(OrderError::InvalidSelection(format!(
                "panel {} is a {} panel, not {}",
                panel.code, panel.method, self.method
            )));
        }
        Ok(Some(panel_id))
    }

    fn compose(&self, selection: &Selection, lines: &mut dyn LineSink) -> Result<(), OrderError> {
        compose_single(self.order_type(), selection, lines)
    }

    /// One graded result per food item of the selected panel.
    fn expected_results(
        &self,
        conn: &Connection,
        detail: &OrderDetail,
        _lines: &[LineItem],
    ) -> Result<Vec<ResultTarget>, OrderError> {
        let Some(panel_id) = detail.element_id else {
            return Ok(Vec::new());
        };
        let foods = db::get_intolerance_panel_foods(conn, &panel_id)?;
        Ok(foods.into_iter().map(|f| ResultTarget::FoodItem(f.id)).collect())
    }
}
