use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{info, instrument, warn};

use crate::{
    collaborators::{GatewayCallback, GatewayPrefill, PaymentApi, PaymentGateway, PaymentProof},
    errors::CheckoutError,
    events::{Event, EventSender},
    models::{PaymentSession, PaymentSessionStatus},
};

/// Drives one payment session through the external gateway and the backend
/// verification call.
///
/// The gateway surface suspends the rest of the checkout while open, so at
/// most one session may be open at a time; a second `collect` while one is
/// pending is rejected without touching the gateway.
#[derive(Clone)]
pub struct PaymentGatewayAdapter {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentApi>,
    events: EventSender,
    in_flight: Arc<AtomicBool>,
}

impl PaymentGatewayAdapter {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<dyn PaymentApi>,
        events: EventSender,
    ) -> Self {
        Self {
            gateway,
            payments,
            events,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the gateway for the session and resolves it to a terminal
    /// status. On a success callback the reference triple is verified with
    /// the payment service before the session is considered paid.
    #[instrument(skip(self, session, prefill), fields(order_id = %session.order_id))]
    pub async fn collect(
        &self,
        session: &mut PaymentSession,
        prefill: &GatewayPrefill,
    ) -> Result<PaymentProof, CheckoutError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(CheckoutError::Payment(
                "another payment is already in progress".into(),
            ));
        }
        let result = self.run(session, prefill).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        session: &mut PaymentSession,
        prefill: &GatewayPrefill,
    ) -> Result<PaymentProof, CheckoutError> {
        let callback = self
            .gateway
            .open(&session.gateway_session_id, session.amount_minor, prefill)
            .await?;

        match callback {
            GatewayCallback::Completed(proof) => self.verify(session, proof).await,
            GatewayCallback::Cancelled => {
                session.status = PaymentSessionStatus::Cancelled;
                info!(order_id = %session.order_id, "payment cancelled by user");
                self.events
                    .send_or_log(Event::PaymentFailed {
                        order_id: Some(session.order_id.clone()),
                        reason: "cancelled".into(),
                    })
                    .await;
                Err(CheckoutError::Payment("payment was cancelled".into()))
            }
            GatewayCallback::Failed(reason) => {
                session.status = PaymentSessionStatus::Failed;
                warn!(order_id = %session.order_id, %reason, "gateway reported failure");
                self.events
                    .send_or_log(Event::PaymentFailed {
                        order_id: Some(session.order_id.clone()),
                        reason: reason.clone(),
                    })
                    .await;
                Err(CheckoutError::Payment(reason))
            }
        }
    }

    async fn verify(
        &self,
        session: &mut PaymentSession,
        proof: PaymentProof,
    ) -> Result<PaymentProof, CheckoutError> {
        let verified = self
            .payments
            .verify_payment(&proof)
            .await
            .map_err(|err| {
                session.status = PaymentSessionStatus::Failed;
                CheckoutError::Verification(format!(
                    "payment succeeded at the gateway but could not be verified, contact support: {}",
                    err
                ))
            })?;

        if !verified {
            session.status = PaymentSessionStatus::Failed;
            return Err(CheckoutError::Verification(
                "payment succeeded at the gateway but could not be verified, contact support"
                    .into(),
            ));
        }

        session.status = PaymentSessionStatus::Succeeded;
        info!(order_id = %session.order_id, payment_ref = %proof.payment_ref, "payment verified");
        self.events
            .send_or_log(Event::PaymentSucceeded {
                order_id: session.order_id.clone(),
            })
            .await;
        Ok(proof)
    }
}
