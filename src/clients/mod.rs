//! HTTP-backed implementations of the collaborator traits.

pub mod orders;
pub mod payments;
pub mod pricing;

use std::time::Duration;

use crate::errors::CheckoutError;

pub use orders::HttpOrderClient;
pub use payments::HttpPaymentClient;
pub use pricing::HttpPricingClient;

pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, CheckoutError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CheckoutError::Internal(format!("failed to build http client: {}", e)))
}
