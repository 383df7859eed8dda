//! Pure order assembly.
//!
//! Turns a cart snapshot into an order aggregate: validates stock
//! sufficiency per line, freezes unit prices and product names, and sums
//! the total. No I/O happens here: callers fetch the snapshot, and the
//! store re-checks stock with conditional decrements when committing.

use crate::error::OrderError;
use aurum_domain::{CartItem, Order, OrderItem, Product, ProductId, ShippingInfo, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// The assembled aggregate, ready to be committed.
#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Assemble an order from a cart snapshot.
///
/// Validation is all-or-nothing: the first failing line aborts the whole
/// assembly, and no partial aggregate is ever returned.
///
/// # Errors
///
/// - `OrderError::CartEmpty` for a cart with no lines
/// - `OrderError::ProductUnavailable` when a line references a product
///   missing from the snapshot (unknown or soft-deleted)
/// - `OrderError::InsufficientStock` when a line wants more units than the
///   snapshot shows in stock
pub fn assemble_order(
    user_id: UserId,
    cart_items: &[CartItem],
    products: &HashMap<ProductId, Product>,
    shipping: ShippingInfo,
) -> Result<AssembledOrder, OrderError> {
    if cart_items.is_empty() {
        return Err(OrderError::CartEmpty);
    }

    // Validate every line and accumulate the total before creating
    // anything.
    let mut total = Decimal::ZERO;
    for item in cart_items {
        let product = products
            .get(&item.product_id)
            .ok_or(OrderError::ProductUnavailable(item.product_id))?;

        let requested = item.quantity.as_i32();
        if requested > product.stock_quantity {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                requested,
                available: product.stock_quantity,
                in_cart: requested,
            });
        }

        total += product.price.as_decimal() * item.quantity.as_decimal();
    }

    let order = Order::new(user_id, total, shipping);

    let items = cart_items
        .iter()
        .map(|item| {
            // Presence was validated above.
            let product = &products[&item.product_id];
            OrderItem::from_product(order.id, product, item.quantity)
        })
        .collect();

    Ok(AssembledOrder { order, items })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_domain::{OrderStatus, Price, Quantity};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn shipping() -> ShippingInfo {
        ShippingInfo::new("Ada Lovelace", "ada@example.com", "12 Gem Street", "London", "E1 6AN", "UK")
            .unwrap()
    }

    fn product(name: &str, price: Decimal, stock: i32) -> Product {
        Product::new(name, "", Price::new(price).unwrap(), stock, "jewelry")
    }

    fn cart_line(cart_id: Uuid, product_id: Uuid, quantity: i32) -> CartItem {
        CartItem::new(cart_id, product_id, Quantity::new(quantity).unwrap())
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let result = assemble_order(Uuid::now_v7(), &[], &HashMap::new(), shipping());
        assert!(matches!(result, Err(OrderError::CartEmpty)));
    }

    #[test]
    fn test_assembles_jewelry_cart_with_exact_total() {
        let cart_id = Uuid::now_v7();
        let ring = product("Gold Ring", dec!(899.99), 10);
        let earrings = product("Diamond Earrings", dec!(1299.50), 4);
        let necklace = product("Pearl Necklace", dec!(650.00), 2);

        let lines = vec![
            cart_line(cart_id, ring.id, 2),
            cart_line(cart_id, earrings.id, 1),
            cart_line(cart_id, necklace.id, 1),
        ];
        let products = catalog(vec![ring, earrings, necklace]);

        let assembled =
            assemble_order(Uuid::now_v7(), &lines, &products, shipping()).unwrap();

        assert_eq!(assembled.order.total_amount, dec!(3749.48));
        assert_eq!(assembled.order.status, OrderStatus::Pending);
        assert_eq!(assembled.items.len(), 3);

        // Totals equal the sum of line subtotals
        let sum: Decimal = assembled.items.iter().map(|i| i.subtotal()).sum();
        assert_eq!(sum, assembled.order.total_amount);
    }

    #[test]
    fn test_insufficient_stock_aborts_whole_assembly() {
        let cart_id = Uuid::now_v7();
        let ring = product("Gold Ring", dec!(899.99), 10);
        let scarce = product("Diamond Earrings", dec!(1299.50), 1);

        let lines = vec![cart_line(cart_id, ring.id, 2), cart_line(cart_id, scarce.id, 3)];
        let scarce_id = scarce.id;
        let products = catalog(vec![ring, scarce]);

        let result = assemble_order(Uuid::now_v7(), &lines, &products, shipping());
        match result {
            Err(OrderError::InsufficientStock { product_id, requested, available, in_cart }) => {
                assert_eq!(product_id, scarce_id);
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
                assert_eq!(in_cart, 3);
            },
            other => panic!("Expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_product_is_unavailable() {
        let cart_id = Uuid::now_v7();
        let ghost_id = Uuid::now_v7();
        let lines = vec![cart_line(cart_id, ghost_id, 1)];

        let result = assemble_order(Uuid::now_v7(), &lines, &HashMap::new(), shipping());
        assert!(matches!(result, Err(OrderError::ProductUnavailable(id)) if id == ghost_id));
    }

    #[test]
    fn test_prices_are_snapshotted_not_referenced() {
        let cart_id = Uuid::now_v7();
        let mut ring = product("Gold Ring", dec!(899.99), 10);
        let lines = vec![cart_line(cart_id, ring.id, 1)];
        let products = catalog(vec![ring.clone()]);

        let assembled =
            assemble_order(Uuid::now_v7(), &lines, &products, shipping()).unwrap();

        // A later price change must not leak into the assembled items
        ring.price = Price::new(dec!(1999.99)).unwrap();
        assert_eq!(assembled.items[0].unit_price.as_decimal(), dec!(899.99));
    }
}
