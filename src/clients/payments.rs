use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::{
    collaborators::{PaymentApi, PaymentProof, PaymentSessionDraft},
    errors::CheckoutError,
};

#[derive(Debug, Serialize, Deserialize)]
struct VerifyResponse {
    #[serde(alias = "isVerified")]
    verified: bool,
}

/// Payment service client: session initiation and callback verification.
#[derive(Clone)]
pub struct HttpPaymentClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, CheckoutError> {
        Ok(Self {
            client: super::build_http_client(timeout_secs)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentClient {
    #[instrument(skip(self))]
    async fn initiate_payment(
        &self,
        order_id: &str,
    ) -> Result<PaymentSessionDraft, CheckoutError> {
        let response = self
            .client
            .post(format!("{}/payments/initiate", self.base_url))
            .json(&json!({ "orderId": order_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, proof), fields(order_ref = %proof.order_ref))]
    async fn verify_payment(&self, proof: &PaymentProof) -> Result<bool, CheckoutError> {
        let response = self
            .client
            .post(format!("{}/payments/verify", self.base_url))
            .json(proof)
            .send()
            .await?
            .error_for_status()?;
        let body: VerifyResponse = response.json().await?;
        Ok(body.verified)
    }
}
