//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use std::env;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Payment gateway configuration
    pub gateway: GatewayConfig,

    /// Product read-cache entry TTL
    pub product_cache_ttl: Duration,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Provider secret API key
    pub secret_key: String,
    /// Webhook endpoint secret for signature verification
    pub webhook_secret: String,
    /// ISO currency code charged for all orders
    pub currency: String,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment (in-memory store, stub gateway)
    Development,
    /// Production environment (PostgreSQL, real gateway)
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let gateway = Self::load_gateway_config(environment)?;
        let product_cache_ttl = Self::load_cache_ttl()?;

        Ok(Self { api, gateway, product_cache_ttl, environment })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            gateway: GatewayConfig {
                secret_key: "sk_test_stub".to_string(),
                webhook_secret: "whsec_test_stub".to_string(),
                currency: "usd".to_string(),
            },
            product_cache_ttl: Duration::from_secs(1),
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("AURUM_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid AURUM_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("AURUM_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("AURUM_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid AURUM_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_gateway_config(environment: Environment) -> DaemonResult<GatewayConfig> {
        let currency = env::var("AURUM_CURRENCY").unwrap_or_else(|_| "usd".to_string());

        // Real credentials are only mandatory in production; the stub
        // gateway ignores them elsewhere.
        let secret_key = match env::var("AURUM_STRIPE_SECRET_KEY") {
            Ok(key) => key,
            Err(_) if environment != Environment::Production => "sk_test_stub".to_string(),
            Err(_) => {
                return Err(DaemonError::Config(
                    "AURUM_STRIPE_SECRET_KEY is required in production".to_string(),
                ))
            },
        };

        let webhook_secret = match env::var("AURUM_STRIPE_WEBHOOK_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment != Environment::Production => "whsec_test_stub".to_string(),
            Err(_) => {
                return Err(DaemonError::Config(
                    "AURUM_STRIPE_WEBHOOK_SECRET is required in production".to_string(),
                ))
            },
        };

        Ok(GatewayConfig { secret_key, webhook_secret, currency })
    }

    fn load_cache_ttl() -> DaemonResult<Duration> {
        let ttl_str = env::var("AURUM_PRODUCT_CACHE_TTL_SECS").unwrap_or_else(|_| "30".to_string());

        let secs = ttl_str.parse::<u64>().map_err(|_| {
            DaemonError::Config(format!("Invalid AURUM_PRODUCT_CACHE_TTL_SECS: {}", ttl_str))
        })?;

        Ok(Duration::from_secs(secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig { host: "0.0.0.0".to_string(), port: 8080 },
            gateway: GatewayConfig {
                secret_key: "sk_test_stub".to_string(),
                webhook_secret: "whsec_test_stub".to_string(),
                currency: "usd".to_string(),
            },
            product_cache_ttl: Duration::from_secs(30),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.gateway.currency, "usd");
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();

        assert_eq!(config.api.port, 0);
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
