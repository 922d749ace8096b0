use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "CHECKOUT";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Constants for the deterministic local price estimate used when the
/// pricing service is unreachable.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FallbackPricing {
    /// Tax applied to the subtotal, as a fraction.
    #[serde(default = "default_fallback_tax_rate")]
    pub tax_rate: Decimal,

    /// Flat delivery fee charged on any non-empty cart.
    #[serde(default = "default_fallback_delivery_fee")]
    pub delivery_fee: Decimal,
}

impl Default for FallbackPricing {
    fn default() -> Self {
        Self {
            tax_rate: default_fallback_tax_rate(),
            delivery_fee: default_fallback_delivery_fee(),
        }
    }
}

fn default_fallback_tax_rate() -> Decimal {
    dec!(0.10)
}

fn default_fallback_delivery_fee() -> Decimal {
    dec!(1.33)
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_pricing_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_order_base_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_payment_base_url() -> String {
    "http://localhost:8083".to_string()
}

/// Application configuration with validation.
///
/// Loaded from `config/default` (if present) overlaid with `CHECKOUT_*`
/// environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base URL of the remote pricing service
    #[serde(default = "default_pricing_base_url")]
    #[validate(url)]
    pub pricing_base_url: String,

    /// Base URL of the order-creation service
    #[serde(default = "default_order_base_url")]
    #[validate(url)]
    pub order_base_url: String,

    /// Base URL of the payment service
    #[serde(default = "default_payment_base_url")]
    #[validate(url)]
    pub payment_base_url: String,

    /// Per-request timeout for collaborator calls, in seconds
    #[serde(default = "default_http_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub http_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub fallback_pricing: FallbackPricing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing_base_url: default_pricing_base_url(),
            order_base_url: default_order_base_url(),
            payment_base_url: default_payment_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            fallback_pricing: FallbackPricing::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from files and environment, then validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config
            .validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

        info!(
            pricing = %app_config.pricing_base_url,
            orders = %app_config.order_base_url,
            payments = %app_config.payment_base_url,
            "configuration loaded"
        );
        Ok(app_config)
    }
}
