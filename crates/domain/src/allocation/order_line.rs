//! Order line value object.

use common::{OrderId, Sku};
use serde::{Deserialize, Serialize};

/// A customer's request for a quantity of a SKU under an order.
///
/// Order lines have no identity: two lines with the same order id, SKU and
/// quantity are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    /// The order this line belongs to.
    pub order_id: OrderId,

    /// The product being ordered.
    pub sku: Sku,

    /// Requested quantity.
    pub quantity: u32,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(order_id: impl Into<OrderId>, sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            order_id: order_id.into(),
            sku: sku.into(),
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_with_equal_fields_are_equal() {
        let a = OrderLine::new("order-1", "RED-CHAIR", 10);
        let b = OrderLine::new("order-1", "RED-CHAIR", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn lines_differing_in_quantity_are_distinct() {
        let a = OrderLine::new("order-1", "RED-CHAIR", 10);
        let b = OrderLine::new("order-1", "RED-CHAIR", 11);
        assert_ne!(a, b);
    }
}
