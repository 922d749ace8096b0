use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    collaborators::CouponApi,
    errors::CheckoutError,
    events::{Event, EventSender, Severity},
    models::Coupon,
};

/// Validates and holds at most one applied discount code.
///
/// The applied coupon lives in the checkout session's coupon slot; the
/// applier enforces the at-most-one rule against that slot. A failed
/// validation leaves the slot untouched and is surfaced as a user message,
/// not a fatal error.
#[derive(Clone)]
pub struct CouponApplier {
    api: Arc<dyn CouponApi>,
    events: EventSender,
}

impl CouponApplier {
    pub fn new(api: Arc<dyn CouponApi>, events: EventSender) -> Self {
        Self { api, events }
    }

    #[instrument(skip(self, slot))]
    pub async fn apply(
        &self,
        slot: &mut Option<Coupon>,
        code: &str,
    ) -> Result<Coupon, CheckoutError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CheckoutError::Validation("enter a coupon code".into()));
        }
        if let Some(applied) = slot.as_ref() {
            return Err(CheckoutError::Validation(format!(
                "coupon {} is already applied, remove it first",
                applied.code
            )));
        }

        match self.api.validate(code).await {
            Ok(Some(coupon)) => {
                info!(code = %coupon.code, discount = %coupon.discount, "coupon applied");
                self.events
                    .send_or_log(Event::CouponApplied {
                        code: coupon.code.clone(),
                        discount: coupon.discount,
                    })
                    .await;
                self.events
                    .notify(format!("Coupon {} applied", coupon.code), Severity::Success)
                    .await;
                *slot = Some(coupon.clone());
                Ok(coupon)
            }
            Ok(None) => {
                self.events
                    .notify(
                        format!("Coupon {} is invalid or expired", code),
                        Severity::Warning,
                    )
                    .await;
                Err(CheckoutError::Validation(format!(
                    "coupon {} is invalid or expired",
                    code
                )))
            }
            Err(err) => {
                warn!(error = %err, "coupon validation failed");
                self.events
                    .notify("Could not validate the coupon, try again", Severity::Warning)
                    .await;
                Err(err)
            }
        }
    }

    /// Removes the applied coupon, if any, and reports what was removed.
    #[instrument(skip(self, slot))]
    pub async fn remove(&self, slot: &mut Option<Coupon>) -> Option<Coupon> {
        let removed = slot.take();
        if let Some(coupon) = removed.as_ref() {
            self.events
                .send_or_log(Event::CouponRemoved {
                    code: coupon.code.clone(),
                })
                .await;
        }
        removed
    }
}
