//! Cart service: line-item writes and the cart view.
//!
//! Product reads go through a pluggable catalog port so a caching
//! decorator can sit in front of the store. Stock checks here are a
//! courtesy for the shopper, not a reservation: checkout re-validates
//! authoritatively inside its transaction, and cart writes never touch
//! `stock_quantity`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use aurum_domain::{Product, ProductId, Quantity, UserId};
use aurum_store::{CartRepository, ProductRepository, Store};

use crate::error::OrderError;
use crate::summary::CartView;

/// Cart line-item operations.
pub struct CartService<S: Store, C: ProductRepository> {
    store: Arc<S>,
    /// Product read path (typically a caching decorator over the store)
    catalog: Arc<C>,
}

impl<S: Store, C: ProductRepository> CartService<S, C> {
    /// Create a new cart service.
    pub fn new(store: Arc<S>, catalog: Arc<C>) -> Self {
        Self { store, catalog }
    }

    /// The user's cart, lazily created on first access.
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, OrderError> {
        let cart = self.store.carts().find_or_create_by_user(user_id).await?;
        let items = self.store.carts().find_items(cart.id).await?;

        let product_ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .catalog
            .find_by_ids(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(CartView::new(&cart, &items, &products))
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// The merged quantity is validated against current stock so shoppers
    /// learn about shortages before checkout.
    ///
    /// # Errors
    ///
    /// - `OrderError::ProductUnavailable` for unknown or delisted products
    /// - `OrderError::InsufficientStock` when the merged quantity exceeds
    ///   what is in stock
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, OrderError> {
        let quantity = Quantity::new(quantity)?;

        let product = self
            .catalog
            .find_by_id(product_id)
            .await?
            .ok_or(OrderError::ProductUnavailable(product_id))?;

        let cart = self.store.carts().find_or_create_by_user(user_id).await?;

        let in_cart = self
            .store
            .carts()
            .find_item(cart.id, product_id)
            .await?
            .map(|item| item.quantity.as_i32())
            .unwrap_or(0);

        let merged = in_cart + quantity.as_i32();
        if merged > product.stock_quantity {
            return Err(OrderError::InsufficientStock {
                product_id,
                requested: merged,
                available: product.stock_quantity,
                in_cart,
            });
        }

        self.store.carts().merge_item(cart.id, product_id, quantity).await?;

        debug!(%user_id, %product_id, quantity = merged, "Cart line merged");
        self.get_cart(user_id).await
    }

    /// Overwrite a line's quantity; zero removes the line.
    pub async fn update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, OrderError> {
        if quantity == 0 {
            return self.remove_item(user_id, product_id).await;
        }

        let quantity = Quantity::new(quantity)?;

        let product = self
            .catalog
            .find_by_id(product_id)
            .await?
            .ok_or(OrderError::ProductUnavailable(product_id))?;

        let cart = self.store.carts().find_or_create_by_user(user_id).await?;

        if quantity.as_i32() > product.stock_quantity {
            let in_cart = self
                .store
                .carts()
                .find_item(cart.id, product_id)
                .await?
                .map(|item| item.quantity.as_i32())
                .unwrap_or(0);

            return Err(OrderError::InsufficientStock {
                product_id,
                requested: quantity.as_i32(),
                available: product.stock_quantity,
                in_cart,
            });
        }

        self.store.carts().set_item_quantity(cart.id, product_id, quantity).await?;
        self.get_cart(user_id).await
    }

    /// Remove a line from the cart.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartView, OrderError> {
        let cart = self.store.carts().find_or_create_by_user(user_id).await?;
        self.store.carts().remove_item(cart.id, product_id).await?;
        self.get_cart(user_id).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aurum_domain::Price;
    use aurum_store::MemoryStore;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn service(store: Arc<MemoryStore>) -> CartService<MemoryStore, MemoryStore> {
        CartService::new(store.clone(), store)
    }

    async fn seed_product(store: &MemoryStore, name: &str, price: &str, stock: i32) -> Product {
        let product = Product::new(
            name,
            "",
            Price::new(price.parse().unwrap()).unwrap(),
            stock,
            "jewelry",
        );
        store.products().save(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_get_cart_lazily_creates() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store);

        let view = carts.get_cart(Uuid::now_v7()).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total, dec!(0));
    }

    #[tokio::test]
    async fn test_add_item_merges_and_prices_live() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let user_id = Uuid::now_v7();

        let ring = seed_product(&store, "Gold Ring", "899.99", 10).await;

        carts.add_item(user_id, ring.id, 2).await.unwrap();
        let view = carts.add_item(user_id, ring.id, 1).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.total, dec!(2699.97));
    }

    #[tokio::test]
    async fn test_add_item_rejects_merged_quantity_beyond_stock() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let user_id = Uuid::now_v7();

        let ring = seed_product(&store, "Gold Ring", "899.99", 5).await;

        carts.add_item(user_id, ring.id, 4).await.unwrap();

        let result = carts.add_item(user_id, ring.id, 2).await;
        match result {
            Err(OrderError::InsufficientStock { product_id, requested, available, in_cart }) => {
                assert_eq!(product_id, ring.id);
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
                assert_eq!(in_cart, 4);
            },
            other => panic!("Expected InsufficientStock, got {:?}", other),
        }

        // The rejected add did not change the cart
        let view = carts.get_cart(user_id).await.unwrap();
        assert_eq!(view.items[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store);

        let ghost = Uuid::now_v7();
        let result = carts.add_item(Uuid::now_v7(), ghost, 1).await;
        assert!(matches!(result, Err(OrderError::ProductUnavailable(id)) if id == ghost));
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let ring = seed_product(&store, "Gold Ring", "899.99", 5).await;

        assert!(carts.add_item(Uuid::now_v7(), ring.id, 0).await.is_err());
        assert!(carts.add_item(Uuid::now_v7(), ring.id, -2).await.is_err());
    }

    #[tokio::test]
    async fn test_update_item_to_zero_removes_line() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let user_id = Uuid::now_v7();

        let ring = seed_product(&store, "Gold Ring", "899.99", 10).await;
        carts.add_item(user_id, ring.id, 2).await.unwrap();

        let view = carts.update_item(user_id, ring.id, 0).await.unwrap();
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_update_item_overwrites_quantity() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let user_id = Uuid::now_v7();

        let ring = seed_product(&store, "Gold Ring", "899.99", 10).await;
        carts.add_item(user_id, ring.id, 2).await.unwrap();

        let view = carts.update_item(user_id, ring.id, 7).await.unwrap();
        assert_eq!(view.items[0].quantity, 7);

        let result = carts.update_item(user_id, ring.id, 11).await;
        assert!(matches!(result, Err(OrderError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_remove_item() {
        let store = Arc::new(MemoryStore::new());
        let carts = service(store.clone());
        let user_id = Uuid::now_v7();

        let ring = seed_product(&store, "Gold Ring", "899.99", 10).await;
        let necklace = seed_product(&store, "Pearl Necklace", "650.00", 3).await;

        carts.add_item(user_id, ring.id, 1).await.unwrap();
        carts.add_item(user_id, necklace.id, 1).await.unwrap();

        let view = carts.remove_item(user_id, ring.id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, necklace.id);
    }
}
