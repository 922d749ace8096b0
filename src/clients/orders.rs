use async_trait::async_trait;
use tracing::instrument;

use crate::{
    collaborators::{CreateOrderResponse, OrderApi},
    errors::CheckoutError,
    models::OrderPayload,
};

/// Order-creation service client.
#[derive(Clone)]
pub struct HttpOrderClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrderClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CheckoutError> {
        Ok(Self {
            client: super::build_http_client(timeout_secs)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl OrderApi for HttpOrderClient {
    #[instrument(skip(self, payload), fields(branch_id = %payload.branch_id, items = payload.items.len()))]
    async fn create_order(
        &self,
        payload: &OrderPayload,
    ) -> Result<CreateOrderResponse, CheckoutError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
