//! Aurum Daemon
//!
//! Backend core for the jewelry store: carts, checkout, payments.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration (in-memory store + stub gateway)
//! cargo run -p aurumd
//!
//! # Run database migrations, then seed the demo catalog
//! DATABASE_URL=postgres://... cargo run -p aurumd -- db migrate
//! DATABASE_URL=postgres://... cargo run -p aurumd -- db init
//!
//! # Production (requires the `postgres` feature)
//! AURUM_ENV=production DATABASE_URL=postgres://... cargo run -p aurumd --features postgres
//! ```
//!
//! # Environment Variables
//!
//! - `AURUM_ENV`: Environment (test, development, production)
//! - `AURUM_API_HOST`: API host (default: 0.0.0.0)
//! - `AURUM_API_PORT`: API port (default: 8080)
//! - `AURUM_CURRENCY`: ISO currency code (default: usd)
//! - `AURUM_STRIPE_SECRET_KEY`: Gateway secret key (required in production)
//! - `AURUM_STRIPE_WEBHOOK_SECRET`: Webhook endpoint secret (required in production)
//! - `AURUM_PRODUCT_CACHE_TTL_SECS`: Product cache TTL (default: 30)
//! - `DATABASE_URL`: PostgreSQL connection string (production and db commands)

use aurumd::{Config, Daemon, Environment};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("aurumd=info".parse()?))
        .init();

    // Database subcommands short-circuit before daemon startup
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "db" {
        return aurumd::db::run_db_command(args).await;
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Aurum Daemon"
    );

    match config.environment {
        Environment::Production => run_production(config).await,
        _ => {
            let daemon = Daemon::new_stub(config);
            daemon.run().await?;
            Ok(())
        },
    }
}

#[cfg(feature = "postgres")]
async fn run_production(config: Config) -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is required in production"))?;

    let pool = sqlx::PgPool::connect(&database_url).await?;
    aurum_db::migrate(&pool).await?;

    let daemon = Daemon::new_postgres(config, pool);
    daemon.run().await?;
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run_production(_config: Config) -> anyhow::Result<()> {
    Err(anyhow::anyhow!(
        "AURUM_ENV=production requires aurumd to be built with the `postgres` feature"
    ))
}
