//! Price resolution: price-list override, then catalog base price, then zero.
//!
//! The resolver never touches global state. It reads through a
//! [`PriceSource`], so the same resolution runs against the live database
//! or against fixture data.

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::PriceCategory;
use crate::models::Money;

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Price lookup failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("No priced element {category} {element_id}")]
    ElementNotFound {
        category: PriceCategory,
        element_id: Uuid,
    },
}

/// Read-only view of the catalog and price lists.
pub trait PriceSource {
    /// Override price from an active price list.
    fn price_list_price(
        &self,
        price_list_id: &Uuid,
        category: PriceCategory,
        element_id: &Uuid,
    ) -> Result<Option<Money>, DatabaseError>;

    /// Catalog base price, `None` if the element does not exist.
    fn base_price(
        &self,
        category: PriceCategory,
        element_id: &Uuid,
    ) -> Result<Option<Money>, DatabaseError>;
}

/// Price source backed by the relational store.
pub struct SqlitePriceSource<'c> {
    conn: &'c Connection,
}

impl<'c> SqlitePriceSource<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl PriceSource for SqlitePriceSource<'_> {
    fn price_list_price(
        &self,
        price_list_id: &Uuid,
        category: PriceCategory,
        element_id: &Uuid,
    ) -> Result<Option<Money>, DatabaseError> {
        db::get_price_list_price(self.conn, price_list_id, category, element_id)
    }

    fn base_price(
        &self,
        category: PriceCategory,
        element_id: &Uuid,
    ) -> Result<Option<Money>, DatabaseError> {
        db::get_base_price(self.conn, category, element_id)
    }
}

pub struct PriceResolver<S> {
    source: S,
}

impl<S: PriceSource> PriceResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Unit price of an element for an optional price list.
    ///
    /// An element missing from both the price list and the catalog resolves
    /// to zero. Callers that cannot accept a zero price use
    /// [`resolve_price_strict`](Self::resolve_price_strict).
    pub fn resolve_price(
        &self,
        category: PriceCategory,
        element_id: &Uuid,
        price_list_id: Option<&Uuid>,
    ) -> Result<Money, PricingError> {
        Ok(self
            .lookup(category, element_id, price_list_id)?
            .unwrap_or(Money::ZERO))
    }

    /// Like [`resolve_price`](Self::resolve_price) but reports an unknown
    /// element instead of pricing it at zero.
    pub fn resolve_price_strict(
        &self,
        category: PriceCategory,
        element_id: &Uuid,
        price_list_id: Option<&Uuid>,
    ) -> Result<Money, PricingError> {
        self.lookup(category, element_id, price_list_id)?
            .ok_or(PricingError::ElementNotFound {
                category,
                element_id: *element_id,
            })
    }

    fn lookup(
        &self,
        category: PriceCategory,
        element_id: &Uuid,
        price_list_id: Option<&Uuid>,
    ) -> Result<Option<Money>, DatabaseError> {
        if let Some(list_id) = price_list_id {
            if let Some(price) = self.source.price_list_price(list_id, category, element_id)? {
                return Ok(Some(price));
            }
        }
        let base = self.source.base_price(category, element_id)?;
        if base.is_none() {
            tracing::debug!(category = %category, element_id = %element_id, "Element not in catalog");
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::{PriceList, PriceListEntry};
    use crate::test_support::Fixture;

    /// In-memory catalog for resolver tests that need no database.
    #[derive(Default)]
    struct FixedPrices {
        base: HashMap<(PriceCategory, Uuid), Money>,
        lists: HashMap<(Uuid, PriceCategory, Uuid), Money>,
    }

    impl PriceSource for FixedPrices {
        fn price_list_price(
            &self,
            price_list_id: &Uuid,
            category: PriceCategory,
            element_id: &Uuid,
        ) -> Result<Option<Money>, DatabaseError> {
            Ok(self.lists.get(&(*price_list_id, category, *element_id)).copied())
        }

        fn base_price(
            &self,
            category: PriceCategory,
            element_id: &Uuid,
        ) -> Result<Option<Money>, DatabaseError> {
            Ok(self.base.get(&(category, *element_id)).copied())
        }
    }

    #[test]
    fn price_list_entry_wins_over_base() {
        let element = Uuid::new_v4();
        let list = Uuid::new_v4();
        let mut prices = FixedPrices::default();
        prices.base.insert((PriceCategory::Assay, element), Money::new(50, 0));
        prices.lists.insert((list, PriceCategory::Assay, element), Money::new(35, 0));

        let resolver = PriceResolver::new(prices);
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &element, Some(&list)).unwrap(),
            Money::new(35, 0)
        );
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &element, None).unwrap(),
            Money::new(50, 0)
        );
    }

    #[test]
    fn missing_entry_falls_back_to_base_price() {
        let element = Uuid::new_v4();
        let mut prices = FixedPrices::default();
        prices.base.insert((PriceCategory::Panel, element), Money::new(120, 0));

        let resolver = PriceResolver::new(prices);
        let price = resolver
            .resolve_price(PriceCategory::Panel, &element, Some(&Uuid::new_v4()))
            .unwrap();
        assert_eq!(price, Money::new(120, 0));
    }

    #[test]
    fn unknown_element_is_zero_unless_strict() {
        let resolver = PriceResolver::new(FixedPrices::default());
        let element = Uuid::new_v4();
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &element, None).unwrap(),
            Money::ZERO
        );
        assert!(matches!(
            resolver.resolve_price_strict(PriceCategory::Assay, &element, None),
            Err(PricingError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn category_is_part_of_the_key() {
        let element = Uuid::new_v4();
        let mut prices = FixedPrices::default();
        prices.base.insert((PriceCategory::Assay, element), Money::new(50, 0));

        let resolver = PriceResolver::new(prices);
        assert_eq!(
            resolver.resolve_price(PriceCategory::Panel, &element, None).unwrap(),
            Money::ZERO
        );
    }

    #[test]
    fn sqlite_resolution_is_deterministic() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let resolver = PriceResolver::new(SqlitePriceSource::new(&conn));

        let first = resolver.resolve_price(PriceCategory::Assay, &fx.assay_a, None).unwrap();
        let second = resolver.resolve_price(PriceCategory::Assay, &fx.assay_a, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Money::new(50, 0));
    }

    #[test]
    fn sqlite_price_list_override_and_fallback() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let list = PriceList {
            id: Uuid::new_v4(),
            name: "Partner clinics".into(),
            active: true,
        };
        db::insert_price_list(&conn, &list).unwrap();
        db::upsert_price_list_entry(
            &conn,
            &PriceListEntry {
                price_list_id: list.id,
                category: PriceCategory::Assay,
                element_id: fx.assay_a,
                price: Money::new(40, 0),
            },
        )
        .unwrap();

        let resolver = PriceResolver::new(SqlitePriceSource::new(&conn));
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &fx.assay_a, Some(&list.id)).unwrap(),
            Money::new(40, 0)
        );
        // No entry for assay B: base price, not zero
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &fx.assay_b, Some(&list.id)).unwrap(),
            Money::new(75, 0)
        );
    }

    #[test]
    fn disabled_price_list_is_ignored() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let list = PriceList {
            id: Uuid::new_v4(),
            name: "Retired list".into(),
            active: true,
        };
        db::insert_price_list(&conn, &list).unwrap();
        db::upsert_price_list_entry(
            &conn,
            &PriceListEntry {
                price_list_id: list.id,
                category: PriceCategory::Assay,
                element_id: fx.assay_a,
                price: Money::new(10, 0),
            },
        )
        .unwrap();
        db::set_price_list_active(&conn, &list.id, false).unwrap();

        let resolver = PriceResolver::new(SqlitePriceSource::new(&conn));
        assert_eq!(
            resolver.resolve_price(PriceCategory::Assay, &fx.assay_a, Some(&list.id)).unwrap(),
            Money::new(50, 0)
        );
    }

    #[test]
    fn intolerance_category_must_match_method() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let resolver = PriceResolver::new(SqlitePriceSource::new(&conn));

        assert_eq!(
            resolver
                .resolve_price(PriceCategory::IntoleranceCytotoxic, &fx.cytotoxic_panel, None)
                .unwrap(),
            Money::new(90, 0)
        );
        assert_eq!(
            resolver
                .resolve_price(PriceCategory::IntoleranceImmunoassay, &fx.cytotoxic_panel, None)
                .unwrap(),
            Money::ZERO
        );
    }
}
