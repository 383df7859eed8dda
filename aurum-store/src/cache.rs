//! Read-through product cache decorator.
//!
//! Wraps a store's product port: reads are served from an in-process TTL
//! map when fresh, writes invalidate synchronously and repopulate
//! asynchronously (best effort). A reader may therefore see one transient
//! miss right after a write, but never stale data beyond that single
//! repopulation cycle.
//!
//! The stock ledger's conditional update always executes against the
//! backing store; the cache never participates in stock correctness.

use crate::error::StoreError;
use crate::repository::{ProductRepository, Store};
use async_trait::async_trait;
use aurum_domain::{Product, ProductId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry {
    product: Product,
    cached_at: Instant,
}

/// Caching decorator over a store's product reads.
pub struct CachedProducts<S> {
    store: Arc<S>,
    ttl: Duration,
    entries: Arc<RwLock<HashMap<ProductId, CacheEntry>>>,
}

impl<S: Store + 'static> CachedProducts<S> {
    /// Create a decorator with the given entry time-to-live.
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of currently cached entries (for tests).
    pub fn cached_count(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    fn fresh(&self, id: ProductId) -> Option<Product> {
        let entries = self.entries.read().unwrap();
        entries
            .get(&id)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.product.clone())
    }

    fn insert(&self, product: &Product) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            product.id,
            CacheEntry { product: product.clone(), cached_at: Instant::now() },
        );
    }

    fn invalidate(&self, id: ProductId) {
        self.entries.write().unwrap().remove(&id);
    }

    /// Refill an entry in the background after a write.
    ///
    /// Best effort only: a failed refill leaves a miss, which the next
    /// read repairs through the normal read-through path.
    fn spawn_repopulate(&self, id: ProductId) {
        let store = self.store.clone();
        let entries = self.entries.clone();

        tokio::spawn(async move {
            match store.products().find_by_id(id).await {
                Ok(Some(product)) => {
                    let mut entries = entries.write().unwrap();
                    entries.insert(id, CacheEntry { product, cached_at: Instant::now() });
                },
                Ok(None) => {
                    // Product gone (soft-deleted); nothing to cache.
                },
                Err(e) => {
                    debug!(product_id = %id, error = %e, "Cache repopulation failed");
                },
            }
        });
    }
}

#[async_trait]
impl<S: Store + 'static> ProductRepository for CachedProducts<S> {
    async fn save(&self, product: &Product) -> Result<(), StoreError> {
        self.store.products().save(product).await?;
        self.invalidate(product.id);
        self.spawn_repopulate(product.id);
        Ok(())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        if let Some(product) = self.fresh(id) {
            return Ok(Some(product));
        }

        let found = self.store.products().find_by_id(id).await?;
        if let Some(ref product) = found {
            self.insert(product);
        }
        Ok(found)
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let mut hits = Vec::new();
        let mut misses = Vec::new();

        for &id in ids {
            match self.fresh(id) {
                Some(product) => hits.push(product),
                None => misses.push(id),
            }
        }

        if !misses.is_empty() {
            let fetched = self.store.products().find_by_ids(&misses).await?;
            for product in &fetched {
                self.insert(product);
            }
            hits.extend(fetched);
        }

        Ok(hits)
    }

    async fn adjust_stock(&self, id: ProductId, delta: i32) -> Result<i32, StoreError> {
        let new_quantity = self.store.products().adjust_stock(id, delta).await?;

        // The backing row changed; drop the stale copy and refill.
        self.invalidate(id);
        self.spawn_repopulate(id);

        Ok(new_quantity)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use aurum_domain::Price;
    use rust_decimal_macros::dec;

    fn create_test_product(stock: i32) -> Product {
        Product::new("Gold Ring", "18k gold band", Price::new(dec!(899.99)).unwrap(), stock, "rings")
    }

    fn cached(ttl: Duration) -> (Arc<MemoryStore>, CachedProducts<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = CachedProducts::new(store.clone(), ttl);
        (store, cache)
    }

    #[tokio::test]
    async fn test_read_through_caches_hit() {
        let (store, cache) = cached(Duration::from_secs(60));
        let product = create_test_product(10);
        store.products().save(&product).await.unwrap();

        assert_eq!(cache.cached_count(), 0);
        let first = cache.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(first.stock_quantity, 10);
        assert_eq!(cache.cached_count(), 1);

        // Mutate the backing store behind the cache's back: the cached
        // copy is served until it is invalidated or expires.
        store.products().adjust_stock(product.id, -5).await.unwrap();
        let second = cache.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(second.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let (store, cache) = cached(Duration::from_millis(0));
        let product = create_test_product(10);
        store.products().save(&product).await.unwrap();

        cache.find_by_id(product.id).await.unwrap().unwrap();
        store.products().adjust_stock(product.id, -5).await.unwrap();

        // Zero TTL: every read goes through to the backing store.
        let fresh = cache.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_write_invalidates_synchronously() {
        let (store, cache) = cached(Duration::from_secs(60));
        let mut product = create_test_product(10);
        store.products().save(&product).await.unwrap();

        cache.find_by_id(product.id).await.unwrap();

        product.stock_quantity = 42;
        cache.save(&product).await.unwrap();

        // Even before the async repopulation lands, the next read must not
        // see the pre-write copy.
        let found = cache.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity, 42);
    }

    #[tokio::test]
    async fn test_adjust_stock_goes_to_backing_store() {
        let (store, cache) = cached(Duration::from_secs(60));
        let product = create_test_product(15);
        store.products().save(&product).await.unwrap();

        cache.find_by_id(product.id).await.unwrap();

        // The conditional update runs against the store, not the cache
        let result = cache.adjust_stock(product.id, -16).await;
        assert!(matches!(result, Err(StoreError::InsufficientStock { available: 15, .. })));

        let remaining = cache.adjust_stock(product.id, -5).await.unwrap();
        assert_eq!(remaining, 10);

        let found = cache.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_find_by_ids_mixes_hits_and_misses() {
        let (store, cache) = cached(Duration::from_secs(60));
        let p1 = create_test_product(10);
        let p2 = create_test_product(5);
        store.products().save(&p1).await.unwrap();
        store.products().save(&p2).await.unwrap();

        // Warm one entry, then batch-fetch both
        cache.find_by_id(p1.id).await.unwrap();
        let found = cache.find_by_ids(&[p1.id, p2.id]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(cache.cached_count(), 2);
    }
}
