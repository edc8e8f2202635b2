//! Document Renderer: executed order → structured [`ReportDocument`].
//!
//! Rendering reads the order, its results and the catalog, and never
//! writes. Each order type lays out its body through [`ReportLayout`].

use std::collections::HashMap;

use rusqlite::Connection;
use uuid::Uuid;

use super::document::{Entry, ReportDocument, ReportHeader, Section};
use super::ReportError;
use crate::db::{self, DatabaseError};
use crate::models::enums::{IntoleranceGrade, IntoleranceMethod, OrderStatus, OrderType};
use crate::models::{Assay, AssayGroup, Order, OrderDetail, ResultRecord, ResultTarget};
use crate::orders::missing_results;

pub const LEGEND_HEADING: &str = "Legend";
pub const RECOMMENDATION_HEADING: &str = "Recommendation";

const RECOMMENDATION: &str = "Discuss these findings with the requesting professional before changing \
your diet. Foods with a reaction are usually excluded for three to six months and then \
reintroduced one at a time, starting from the mildest grade.";

/// Body layout of one order type.
pub trait ReportLayout: Sync {
    fn sections(
        &self,
        conn: &Connection,
        order: &Order,
        detail: &OrderDetail,
        results: &[ResultRecord],
    ) -> Result<Vec<Section>, ReportError>;
}

struct GeneticLayout;
struct MicrobiomeLayout;
struct IntoleranceLayout;

static GENETIC: GeneticLayout = GeneticLayout;
static MICROBIOME: MicrobiomeLayout = MicrobiomeLayout;
static INTOLERANCE: IntoleranceLayout = IntoleranceLayout;

pub fn layout_of(order_type: OrderType) -> &'static dyn ReportLayout {
    match order_type {
        OrderType::Genetic => &GENETIC,
        OrderType::Microbiome => &MICROBIOME,
        OrderType::IntoleranceCytotoxic | OrderType::IntoleranceImmunoassay => &INTOLERANCE,
    }
}

/// Render the report of an `executed` order whose expected results are
/// all recorded.
pub fn render(
    conn: &Connection,
    order_id: &Uuid,
    scientist_id: &Uuid,
    lab_lines: &[String],
) -> Result<ReportDocument, ReportError> {
    let order = db::get_order(conn, order_id)?.ok_or(ReportError::OrderNotFound(*order_id))?;
    if order.status != OrderStatus::Executed {
        return Err(ReportError::InvalidState {
            order_id: *order_id,
            status: order.status,
            expected: OrderStatus::Executed,
        });
    }
    let missing = missing_results(conn, order_id)?;
    if !missing.is_empty() {
        return Err(ReportError::IncompleteResults {
            order_id: *order_id,
            missing: missing.len(),
        });
    }

    let patient = db::get_patient(conn, &order.patient_id)?
        .ok_or_else(|| DatabaseError::not_found("Patient", order.patient_id))?;
    let professional = db::get_professional(conn, &order.professional_id)?
        .ok_or_else(|| DatabaseError::not_found("Professional", order.professional_id))?;
    let scientist = db::get_scientist(conn, scientist_id)?
        .ok_or_else(|| DatabaseError::not_found("Scientist", scientist_id))?;
    let detail = db::get_order_detail(conn, order_id)?
        .ok_or_else(|| DatabaseError::not_found("OrderDetail", order_id))?;
    let results = db::get_results(conn, order_id)?;

    let sections = layout_of(order.order_type).sections(conn, &order, &detail, &results)?;

    Ok(ReportDocument {
        title: format!("{} report", order.order_type.label()),
        header: ReportHeader {
            lab_lines: lab_lines.to_vec(),
            order_code: order.code.clone(),
            order_type: order.order_type,
            patient_name: format!("{} {}", patient.first_name, patient.last_name),
            patient_birth_date: patient.birth_date,
            professional_name: professional.name,
            scientist_name: scientist.name,
            executed_at: order.executed_at,
        },
        sections,
    })
}

fn detail_element(detail: &OrderDetail) -> Result<Uuid, ReportError> {
    detail
        .element_id
        .ok_or_else(|| ReportError::Render(format!("order {} has no detail element", detail.order_id)))
}

impl ReportLayout for GeneticLayout {
    /// One section per assay group, groups by display order, assays by code.
    fn sections(
        &self,
        conn: &Connection,
        _order: &Order,
        _detail: &OrderDetail,
        results: &[ResultRecord],
    ) -> Result<Vec<Section>, ReportError> {
        let mut groups: HashMap<Uuid, AssayGroup> = HashMap::new();
        let mut rows: Vec<(Uuid, Assay, &ResultRecord)> = Vec::new();

        for record in results {
            let ResultTarget::Assay(assay_id) = record.target else {
                continue;
            };
            let assay = db::get_assay(conn, &assay_id)?
                .ok_or_else(|| DatabaseError::not_found("Assay", assay_id))?;
            if !groups.contains_key(&assay.group_id) {
                let group = db::get_assay_group(conn, &assay.group_id)?
                    .ok_or_else(|| DatabaseError::not_found("AssayGroup", assay.group_id))?;
                groups.insert(group.id, group);
            }
            rows.push((assay.group_id, assay, record));
        }

        let group_key = |id: &Uuid| {
            groups
                .get(id)
                .map(|g| (g.display_order, g.name.clone()))
                .unwrap_or((i64::MAX, String::new()))
        };
        rows.sort_by(|a, b| {
            group_key(&a.0)
                .cmp(&group_key(&b.0))
                .then_with(|| a.1.code.cmp(&b.1.code))
        });

        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<Uuid> = None;
        for (group_id, assay, record) in rows {
            if current != Some(group_id) {
                let heading = groups.get(&group_id).map(|g| g.name.clone()).unwrap_or_default();
                sections.push(Section::new(heading));
                current = Some(group_id);
            }
            if let Some(section) = sections.last_mut() {
                section.entries.push(Entry::Row(vec![
                    assay.code,
                    assay.description,
                    record.classification.label().to_string(),
                    record.note.clone().unwrap_or_default(),
                ]));
            }
        }
        Ok(sections)
    }
}

impl ReportLayout for MicrobiomeLayout {
    /// Cover page only: the full analysis is the externally uploaded document.
    fn sections(
        &self,
        conn: &Connection,
        order: &Order,
        detail: &OrderDetail,
        _results: &[ResultRecord],
    ) -> Result<Vec<Section>, ReportError> {
        let type_id = detail_element(detail)?;
        let assay_type = db::get_microbiome_assay_type(conn, &type_id)?
            .ok_or_else(|| DatabaseError::not_found("MicrobiomeAssayType", type_id))?;

        let analysis = Section::new("Analysis")
            .row(["Assay", assay_type.name.as_str()])
            .row(["Code", assay_type.code.as_str()]);

        let full_report = match db::get_external_document(conn, &order.id)? {
            Some(doc) => Section::new("Full report")
                .text("The complete analysis is delivered as a separate document.")
                .row(["SHA-256", doc.content_hash.as_str()]),
            None => Section::new("Full report")
                .text("The complete analysis will follow as a separate document."),
        };

        Ok(vec![analysis, full_report])
    }
}

impl ReportLayout for IntoleranceLayout {
    /// Food items grouped by grade, most severe first, then a fixed legend
    /// and recommendation.
    fn sections(
        &self,
        conn: &Connection,
        order: &Order,
        detail: &OrderDetail,
        results: &[ResultRecord],
    ) -> Result<Vec<Section>, ReportError> {
        let panel_id = detail_element(detail)?;
        let panel = db::get_intolerance_panel(conn, &panel_id)?
            .ok_or_else(|| DatabaseError::not_found("IntolerancePanel", panel_id))?;

        let mut by_grade: HashMap<IntoleranceGrade, Vec<String>> = HashMap::new();
        for record in results {
            let ResultTarget::FoodItem(food_id) = record.target else {
                continue;
            };
            let Some(grade) = record.classification.grade() else {
                continue;
            };
            let food = db::get_food_item(conn, &food_id)?
                .ok_or_else(|| DatabaseError::not_found("FoodItem", food_id))?;
            by_grade.entry(grade).or_default().push(food.name);
        }

        let method = match order.order_type.intolerance_method() {
            Some(IntoleranceMethod::Cytotoxic) => "Cytotoxic test",
            Some(IntoleranceMethod::Immunoassay) => "Immunoassay",
            None => "",
        };
        let mut sections = vec![Section::new("Panel")
            .row(["Panel", panel.name.as_str()])
            .row(["Method", method])];

        for grade in IntoleranceGrade::DESCENDING {
            let mut foods = by_grade.remove(&grade).unwrap_or_default();
            foods.sort();
            let mut section = Section::new(grade.label());
            for food in foods {
                section = section.row([food]);
            }
            sections.push(section);
        }

        let mut legend = Section::new(LEGEND_HEADING);
        for grade in IntoleranceGrade::DESCENDING {
            legend = legend.row([
                grade.level().to_string(),
                grade.label().to_string(),
                grade_meaning(grade).to_string(),
            ]);
        }
        sections.push(legend);
        sections.push(Section::new(RECOMMENDATION_HEADING).text(RECOMMENDATION));

        Ok(sections)
    }
}

fn grade_meaning(grade: IntoleranceGrade) -> &'static str {
    match grade {
        IntoleranceGrade::Severe => "Strong reaction, exclude from the diet",
        IntoleranceGrade::Moderate => "Clear reaction, avoid",
        IntoleranceGrade::Mild => "Weak reaction, limit and rotate",
        IntoleranceGrade::Tolerated => "No significant reaction",
    }
}
