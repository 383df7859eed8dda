//! Daemon: runtime wiring and server lifecycle.
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Wire store, gateway, and services
//! 3. Start the API server
//! 4. Graceful shutdown on SIGINT

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use aurum_orders::{CartService, OrderService};
use aurum_payments::{PaymentGatewayPort, PaymentService, StubGateway};
use aurum_store::{MemoryStore, ProductRepository, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main Aurum daemon.
pub struct Daemon<S, C, G>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    /// Configuration
    config: Config,
    /// Shared handler state
    state: Arc<ApiState<S, C, G>>,
}

impl Daemon<MemoryStore, MemoryStore, StubGateway> {
    /// Create a daemon with stub components (for testing/development).
    ///
    /// Uses the in-memory store (also serving as its own catalog read
    /// path) and the scripted stub gateway.
    pub fn new_stub(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::new());

        let state = Arc::new(ApiState {
            carts: CartService::new(store.clone(), store.clone()),
            orders: OrderService::new(store.clone()),
            payments: PaymentService::new(store, gateway, config.gateway.currency.clone()),
            webhook_secret: config.gateway.webhook_secret.clone(),
        });

        Self { config, state }
    }
}

#[cfg(feature = "postgres")]
mod production {
    use super::*;
    use aurum_gateway::StripeClient;
    use aurum_store::{CachedProducts, PgStore};
    use sqlx::PgPool;

    impl Daemon<PgStore, CachedProducts<PgStore>, StripeClient> {
        /// Create a production daemon: PostgreSQL store, cached product
        /// reads, real gateway client.
        pub fn new_postgres(config: Config, pool: PgPool) -> Self {
            let store = Arc::new(PgStore::new(Arc::new(pool)));
            let catalog =
                Arc::new(CachedProducts::new(store.clone(), config.product_cache_ttl));
            let gateway =
                Arc::new(StripeClient::new(config.gateway.secret_key.clone()));

            let state = Arc::new(ApiState {
                carts: CartService::new(store.clone(), catalog),
                orders: OrderService::new(store.clone()),
                payments: PaymentService::new(store, gateway, config.gateway.currency.clone()),
                webhook_secret: config.gateway.webhook_secret.clone(),
            });

            Self { config, state }
        }
    }
}

impl<S, C, G> Daemon<S, C, G>
where
    S: Store + 'static,
    C: ProductRepository + 'static,
    G: PaymentGatewayPort + 'static,
{
    /// Run the daemon.
    ///
    /// Blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Aurum daemon"
        );

        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Server(format!("Failed to bind {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Server(e.to_string()))?;
        info!(%local_addr, "API server started");

        let router = create_router(self.state);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        info!("Daemon stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}
