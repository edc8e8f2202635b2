//! Seeded catalog shared by the unit tests of several modules.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db;
use crate::models::enums::{IntoleranceMethod, OrderStatus, OrderType};
use crate::models::*;
use crate::orders::{advance, create_order, NewOrder, Selection};

pub(crate) const PATIENT_FISCAL_CODE: &str = "RSSMRA80A01H501U";

pub(crate) struct Fixture {
    pub cardio_group: Uuid,
    pub metabolism_group: Uuid,
    /// MTHFR, metabolism, 50.00
    pub assay_a: Uuid,
    /// APOE, cardio, 75.00
    pub assay_b: Uuid,
    /// F5, cardio, 30.00
    pub assay_c: Uuid,
    /// Cardio panel (APOE + F5), 150.00
    pub panel: Uuid,
    /// Microbiome assay type, 200.00
    pub microbiome_type: Uuid,
    /// Wheat, Milk, Egg, Tomato
    pub foods: Vec<Uuid>,
    /// Cytotoxic intolerance panel over `foods`, 90.00
    pub cytotoxic_panel: Uuid,
    /// Immunoassay intolerance panel over `foods`, 110.00
    pub immunoassay_panel: Uuid,
    pub patient: Uuid,
    pub professional: Uuid,
    pub scientist: Uuid,
}

impl Fixture {
    pub fn seed(conn: &Connection) -> Self {
        let cardio_group = Uuid::new_v4();
        let metabolism_group = Uuid::new_v4();
        db::insert_assay_group(
            conn,
            &AssayGroup { id: cardio_group, name: "Cardiovascular".into(), display_order: 1 },
        )
        .unwrap();
        db::insert_assay_group(
            conn,
            &AssayGroup { id: metabolism_group, name: "Metabolism".into(), display_order: 2 },
        )
        .unwrap();

        let assay = |code: &str, description: &str, group_id: Uuid, price: Money| {
            let id = Uuid::new_v4();
            db::insert_assay(
                conn,
                &Assay {
                    id,
                    code: code.into(),
                    description: description.into(),
                    group_id,
                    base_price: price,
                    active: true,
                },
            )
            .unwrap();
            id
        };
        let assay_a = assay("MTHFR", "Methylenetetrahydrofolate reductase", metabolism_group, Money::new(50, 0));
        let assay_b = assay("APOE", "Apolipoprotein E", cardio_group, Money::new(75, 0));
        let assay_c = assay("F5", "Coagulation factor V Leiden", cardio_group, Money::new(30, 0));

        let panel = Uuid::new_v4();
        db::insert_panel(
            conn,
            &Panel {
                id: panel,
                code: "CARDIO".into(),
                name: "Cardiovascular risk".into(),
                base_price: Money::new(150, 0),
                active: true,
            },
            &[assay_b, assay_c],
        )
        .unwrap();

        let microbiome_type = Uuid::new_v4();
        db::insert_microbiome_assay_type(
            conn,
            &MicrobiomeAssayType {
                id: microbiome_type,
                code: "GUT16S".into(),
                name: "Gut microbiome 16S".into(),
                base_price: Money::new(200, 0),
                active: true,
            },
        )
        .unwrap();

        let foods: Vec<Uuid> = ["Wheat", "Milk", "Egg", "Tomato"]
            .iter()
            .map(|name| {
                let id = Uuid::new_v4();
                db::insert_food_item(conn, &FoodItem { id, name: (*name).into() }).unwrap();
                id
            })
            .collect();

        let intolerance_panel = |code: &str, method: IntoleranceMethod, price: Money| {
            let id = Uuid::new_v4();
            db::insert_intolerance_panel(
                conn,
                &IntolerancePanel {
                    id,
                    code: code.into(),
                    name: format!("Food panel {code}"),
                    method,
                    base_price: price,
                    active: true,
                },
                &foods,
            )
            .unwrap();
            id
        };
        let cytotoxic_panel = intolerance_panel("FOOD-CT", IntoleranceMethod::Cytotoxic, Money::new(90, 0));
        let immunoassay_panel =
            intolerance_panel("FOOD-IE", IntoleranceMethod::Immunoassay, Money::new(110, 0));

        let patient = Uuid::new_v4();
        db::insert_patient(
            conn,
            &Patient {
                id: patient,
                first_name: "Mario".into(),
                last_name: "Rossi".into(),
                fiscal_code: PATIENT_FISCAL_CODE.into(),
                birth_date: None,
            },
        )
        .unwrap();

        let professional = Uuid::new_v4();
        db::insert_professional(
            conn,
            &Professional {
                id: professional,
                name: "Dr. Bianchi".into(),
                email: None,
                price_list_id: None,
            },
        )
        .unwrap();

        let scientist = Uuid::new_v4();
        db::insert_scientist(
            conn,
            &Scientist {
                id: scientist,
                name: "Dr. Verdi".into(),
                registration: Some("ONB-1234".into()),
            },
        )
        .unwrap();

        Self {
            cardio_group,
            metabolism_group,
            assay_a,
            assay_b,
            assay_c,
            panel,
            microbiome_type,
            foods,
            cytotoxic_panel,
            immunoassay_panel,
            patient,
            professional,
            scientist,
        }
    }

    /// Create an order for the fixture patient and walk it to `executed`.
    pub fn executed_order(&self, conn: &Connection, order_type: OrderType, selection: Selection) -> Uuid {
        let order = create_order(
            conn,
            &NewOrder {
                patient_id: self.patient,
                professional_id: self.professional,
                order_type,
                selection,
                discount: None,
            },
        )
        .unwrap();
        advance(conn, &order.id, OrderStatus::InProgress).unwrap();
        advance(conn, &order.id, OrderStatus::Executed).unwrap();
        order.id
    }
}
