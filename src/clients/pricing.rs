use async_trait::async_trait;
use tracing::instrument;

use crate::{
    collaborators::{CouponApi, PricingApi, RemoteQuote},
    errors::CheckoutError,
    models::Coupon,
};

/// Pricing service client. Also serves coupon validation, which the pricing
/// service hosts.
#[derive(Clone)]
pub struct HttpPricingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPricingClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CheckoutError> {
        Ok(Self {
            client: super::build_http_client(timeout_secs)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PricingApi for HttpPricingClient {
    #[instrument(skip(self))]
    async fn calculate_cart(
        &self,
        address_id: &str,
        coupon_code: Option<String>,
    ) -> Result<RemoteQuote, CheckoutError> {
        let mut request = self
            .client
            .get(format!("{}/cart/price", self.base_url))
            .query(&[("addressId", address_id)]);
        if let Some(code) = coupon_code {
            request = request.query(&[("coupon", code)]);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CouponApi for HttpPricingClient {
    #[instrument(skip(self))]
    async fn validate(&self, code: &str) -> Result<Option<Coupon>, CheckoutError> {
        let response = self
            .client
            .get(format!("{}/coupons/{}", self.base_url, code))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }
}
