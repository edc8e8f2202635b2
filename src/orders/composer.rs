//! Order Detail Composer: persists an order's detail row and priced line
//! items in one transaction and returns the subtotal.

use rusqlite::Connection;
use uuid::Uuid;

use super::kind::{kind_of, LineSink};
use super::selection::Selection;
use super::OrderError;
use crate::db::{self, DatabaseError};
use crate::models::enums::{LineItemKind, OrderType, PriceCategory};
use crate::models::{final_price, LineItem, Money, OrderDetail};
use crate::pricing::{PriceResolver, PriceSource, SqlitePriceSource};

/// Compose a persisted, not yet composed order. All-or-nothing: on any
/// failure the order keeps zero line items and no detail row.
pub fn compose(
    conn: &Connection,
    order_id: &Uuid,
    order_type: OrderType,
    selection: &Selection,
) -> Result<Money, OrderError> {
    let tx = conn.unchecked_transaction()?;
    let total = compose_in(&tx, order_id, order_type, selection)?;
    tx.commit()?;
    Ok(total)
}

/// Composition body. The caller owns the transaction.
pub(crate) fn compose_in(
    conn: &Connection,
    order_id: &Uuid,
    order_type: OrderType,
    selection: &Selection,
) -> Result<Money, OrderError> {
    let order = db::get_order(conn, order_id)?.ok_or(OrderError::NotFound(*order_id))?;
    if order.order_type != order_type {
        return Err(OrderError::InvalidSelection(format!(
            "order {} is {}, not {order_type}",
            order.code, order.order_type
        )));
    }
    if db::get_order_detail(conn, order_id)?.is_some() {
        return Err(OrderError::InvalidSelection(format!(
            "order {} is already composed",
            order.code
        )));
    }
    let professional = db::get_professional(conn, &order.professional_id)?
        .ok_or_else(|| DatabaseError::not_found("Professional", order.professional_id))?;

    let kind = kind_of(order_type);
    db::insert_order_detail(
        conn,
        &OrderDetail {
            order_id: *order_id,
            order_type,
            element_id: kind.detail_element(conn, selection)?,
        },
    )?;

    let resolver = PriceResolver::new(SqlitePriceSource::new(conn));
    let mut writer = LineWriter {
        conn,
        order_id: *order_id,
        resolver: &resolver,
        price_list_id: professional.price_list_id,
        position: 0,
        total: Money::ZERO,
    };
    kind.compose(selection, &mut writer)?;

    let total = writer.total;
    db::update_order_prices(conn, order_id, total, order.discount, final_price(total, order.discount))?;

    tracing::info!(
        order_id = %order_id,
        order_type = %order_type,
        lines = writer.position,
        total = %total,
        "Order composed"
    );
    Ok(total)
}

/// Prices each pushed element and persists it as a line item.
struct LineWriter<'a, S> {
    conn: &'a Connection,
    order_id: Uuid,
    resolver: &'a PriceResolver<S>,
    price_list_id: Option<Uuid>,
    position: i64,
    total: Money,
}

impl<S: PriceSource> LineSink for LineWriter<'_, S> {
    fn push(
        &mut self,
        kind: LineItemKind,
        category: PriceCategory,
        element_id: Uuid,
        parent_line_id: Option<Uuid>,
    ) -> Result<Uuid, OrderError> {
        // Unknown elements price at zero; disabled ones are not orderable.
        if db::element_active(self.conn, category, &element_id)? == Some(false) {
            return Err(OrderError::InvalidSelection(format!(
                "{category} {element_id} is disabled"
            )));
        }
        let unit_price = self
            .resolver
            .resolve_price(category, &element_id, self.price_list_id.as_ref())?;

        let line = LineItem {
            id: Uuid::new_v4(),
            order_id: self.order_id,
            parent_line_id,
            kind,
            category,
            element_id,
            unit_price,
            position: self.position,
        };
        db::insert_line_item(self.conn, &line)?;

        self.position += 1;
        self.total += unit_price;
        Ok(line.id)
    }
}
