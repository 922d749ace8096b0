use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    collaborators::{AddressRepository, CartApi},
    errors::CheckoutError,
    events::{Event, EventSender, Severity},
    models::{
        CartSnapshot, Coordinates, Coupon, DeliveryAddress, PaymentMethod, PriceBreakdown,
    },
    services::{
        coupons::CouponApplier,
        orders::{OrderPlacementService, PlacementContext},
        payments::PaymentGatewayAdapter,
        pricing::PricingCalculator,
        serviceability::is_serviceable,
    },
};

/// The seller branch currently being browsed, with the geo data the
/// serviceability check needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchContext {
    pub branch_id: String,
    pub coordinates: Option<Coordinates>,
    pub service_radius_km: Option<f64>,
}

/// The step the checkout surface is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutStage {
    Review,
    Summary,
    Payment,
}

/// Transient sub-state within a step. One tagged union instead of a bag of
/// flags, so impossible combinations cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutPhase {
    Idle,
    Validating,
    Conflict,
    Submitting,
    AwaitingPayment,
    Succeeded,
    Failed { reason: String, retryable: bool },
}

/// How the user resolved a branch conflict.
#[derive(Debug, Clone)]
pub enum ConflictResolution {
    /// Abandon the old cart and keep browsing the current branch.
    ClearCart,
    /// Go back to the branch the cart belongs to.
    SwitchBranch(BranchContext),
}

/// State record for one opening of the checkout surface.
///
/// Created when the surface opens, reset to Review/Idle and discarded when
/// it closes or the order completes. The step position is never persisted
/// across openings.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub stage: CheckoutStage,
    pub phase: CheckoutPhase,
    pub branch: BranchContext,
    pub cart: CartSnapshot,
    pub address: Option<DeliveryAddress>,
    pub saved_addresses: Vec<DeliveryAddress>,
    pub coupon: Option<Coupon>,
    pub breakdown: PriceBreakdown,
    pub payment_method: Option<PaymentMethod>,
    pub tip: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed: bool,
}

impl CheckoutSession {
    fn new(
        branch: BranchContext,
        cart: CartSnapshot,
        address: Option<DeliveryAddress>,
        saved_addresses: Vec<DeliveryAddress>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: CheckoutStage::Review,
            phase: CheckoutPhase::Idle,
            branch,
            cart,
            address,
            saved_addresses,
            coupon: None,
            breakdown: PriceBreakdown::zero(),
            payment_method: None,
            tip: Decimal::ZERO,
            opened_at: Utc::now(),
            closed: false,
        }
    }

    fn reset(&mut self) {
        self.stage = CheckoutStage::Review;
        self.phase = CheckoutPhase::Idle;
        self.payment_method = None;
        self.closed = true;
    }

    /// Whether an order-placement attempt is currently in flight.
    pub fn is_placing(&self) -> bool {
        matches!(
            self.phase,
            CheckoutPhase::Submitting | CheckoutPhase::AwaitingPayment
        )
    }

    fn placement_context(&self) -> PlacementContext<'_> {
        PlacementContext {
            browsing_branch: &self.branch.branch_id,
            cart_branch: self.cart.branch_id.as_deref(),
            address: self.address.as_ref(),
            coupon: self.coupon.as_ref(),
            tip: self.tip,
        }
    }
}

/// The checkout state machine. Sequences pricing, serviceability, order
/// placement, and payment collection off user actions, and owns the mapping
/// from collaborator failures to checkout phases.
#[derive(Clone)]
pub struct CheckoutService {
    pricing: PricingCalculator,
    coupons: CouponApplier,
    placement: OrderPlacementService,
    gateway: PaymentGatewayAdapter,
    cart: Arc<dyn CartApi>,
    addresses: Arc<dyn AddressRepository>,
    events: EventSender,
}

impl CheckoutService {
    pub fn new(
        pricing: PricingCalculator,
        coupons: CouponApplier,
        placement: OrderPlacementService,
        gateway: PaymentGatewayAdapter,
        cart: Arc<dyn CartApi>,
        addresses: Arc<dyn AddressRepository>,
        events: EventSender,
    ) -> Self {
        Self {
            pricing,
            coupons,
            placement,
            gateway,
            cart,
            addresses,
            events,
        }
    }

    /// The fixed catalog of payment methods offered on the payment step.
    pub fn payment_methods(&self) -> &'static [PaymentMethod] {
        PaymentMethod::catalog()
    }

    /// Opens the checkout surface: reads the selected address and the
    /// persisted cart, always starting at Review/Idle.
    #[instrument(skip(self))]
    pub async fn open(&self, branch: BranchContext) -> Result<CheckoutSession, CheckoutError> {
        let address = self.addresses.selected_address().await?;
        let saved_addresses = self.addresses.saved_addresses().await?;
        let cart = self.cart.authoritative_cart().await?;
        let mut session = CheckoutSession::new(branch, cart, address, saved_addresses);

        info!(session_id = %session.id, branch_id = %session.branch.branch_id, "checkout opened");
        self.events
            .send_or_log(Event::CheckoutOpened {
                session_id: session.id,
                branch_id: session.branch.branch_id.clone(),
            })
            .await;

        self.refresh_quote(&mut session).await;
        Ok(session)
    }

    /// Closes the surface. Records the selected address for next time and
    /// resets the step; in-flight work resolves into a discarded generation.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn close(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        if let Some(address) = &session.address {
            if let Err(err) = self.addresses.record_selected(address).await {
                warn!(error = %err, "could not persist selected address");
            }
        }
        self.pricing.invalidate();
        session.reset();
        self.events
            .send_or_log(Event::CheckoutClosed {
                session_id: session.id,
            })
            .await;
        Ok(())
    }

    /// Recomputes the price breakdown for the session's current inputs.
    /// Superseded results are dropped by the calculator's generation guard.
    pub async fn refresh_quote(&self, session: &mut CheckoutSession) {
        self.pricing.invalidate();
        if let Some(breakdown) = self
            .pricing
            .calculate(
                session.address.as_ref(),
                session.coupon.as_ref(),
                &session.cart.items,
            )
            .await
        {
            if !session.closed {
                session.breakdown = breakdown;
            }
        }
    }

    /// Review → Summary. Requires an address with coordinates and a
    /// serviceable branch; an unserviceable cart must not silently persist,
    /// so it is cleared before the user is told.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn proceed_to_summary(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<(), CheckoutError> {
        if session.stage != CheckoutStage::Review {
            return Err(CheckoutError::Validation(
                "already past the review step".into(),
            ));
        }
        let user_coordinates = match session.address.as_ref() {
            None => {
                return Err(CheckoutError::Validation(
                    "select a delivery address first".into(),
                ))
            }
            Some(address) if !address.has_coordinates() => {
                return Err(CheckoutError::Validation("address invalid".into()))
            }
            Some(address) => address.coordinates,
        };

        session.phase = CheckoutPhase::Validating;
        let serviceable = is_serviceable(
            user_coordinates,
            session.branch.coordinates,
            session.branch.service_radius_km,
        );
        session.phase = CheckoutPhase::Idle;

        if !serviceable {
            if let Err(err) = self.cart.clear().await {
                warn!(error = %err, "failed to clear unserviceable cart");
            }
            session.cart.items.clear();
            session.cart.branch_id = None;
            self.refresh_quote(session).await;

            self.events
                .send_or_log(Event::CartCleared {
                    reason: "address not serviceable".into(),
                })
                .await;
            self.events
                .notify(
                    "This address is outside the delivery area",
                    Severity::Error,
                )
                .await;
            return Err(CheckoutError::Validation(
                "delivery is not available at the selected address".into(),
            ));
        }

        session.stage = CheckoutStage::Summary;
        Ok(())
    }

    pub fn back_to_review(&self, session: &mut CheckoutSession) {
        if session.stage == CheckoutStage::Summary {
            session.stage = CheckoutStage::Review;
        }
    }

    /// Summary → Payment. The address must still be selected; the cart can
    /// have changed underneath us, which only repricing cares about.
    pub fn proceed_to_payment(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        if session.stage != CheckoutStage::Summary {
            return Err(CheckoutError::Validation("review the order first".into()));
        }
        if session.address.is_none() {
            return Err(CheckoutError::Validation(
                "select a delivery address first".into(),
            ));
        }
        session.stage = CheckoutStage::Payment;
        Ok(())
    }

    /// Back from the payment step goes to Review, not Summary.
    pub fn back_from_payment(&self, session: &mut CheckoutSession) {
        if session.stage == CheckoutStage::Payment && !session.is_placing() {
            session.stage = CheckoutStage::Review;
        }
    }

    pub fn select_payment_method(
        &self,
        session: &mut CheckoutSession,
        method: PaymentMethod,
    ) -> Result<(), CheckoutError> {
        if session.stage != CheckoutStage::Payment {
            return Err(CheckoutError::Validation(
                "payment methods are chosen on the payment step".into(),
            ));
        }
        session.payment_method = Some(method);
        Ok(())
    }

    pub fn set_tip(&self, session: &mut CheckoutSession, tip: Decimal) {
        session.tip = tip;
    }

    /// Confirms the order with the selected payment method: places the
    /// order, opens the gateway, and resolves the attempt to Succeeded or
    /// Failed. Re-entrant confirms while an attempt is in flight are
    /// ignored.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn confirm_order(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        if session.is_placing() {
            debug!("placement already in flight, ignoring");
            return Ok(());
        }
        if session.phase == CheckoutPhase::Conflict {
            return Err(CheckoutError::Conflict(
                "resolve the branch conflict first".into(),
            ));
        }
        if session.stage != CheckoutStage::Payment {
            return Err(CheckoutError::Validation(
                "complete the previous steps first".into(),
            ));
        }
        if session.payment_method.is_none() {
            return Err(CheckoutError::Validation(
                "select a payment method".into(),
            ));
        }

        session.phase = CheckoutPhase::Submitting;
        let placement_result = self.placement.place_order(session.placement_context()).await;
        let placed = match placement_result {
            Ok(placed) => placed,
            Err(err) => {
                self.fail(session, &err).await;
                return Err(err);
            }
        };

        session.phase = CheckoutPhase::AwaitingPayment;
        let mut payment = placed.session;
        match self.gateway.collect(&mut payment, &placed.prefill).await {
            Ok(_proof) => {
                if let Err(err) = self.cart.clear().await {
                    warn!(error = %err, "cart clear after successful order failed");
                }
                session.cart.items.clear();
                session.cart.branch_id = None;
                session.phase = CheckoutPhase::Succeeded;
                self.events
                    .notify("Order placed, payment received", Severity::Success)
                    .await;
                Ok(())
            }
            Err(err) => {
                // The cart is untouched; the user may retry from here.
                self.fail(session, &err).await;
                Err(err)
            }
        }
    }

    /// Resolves a branch conflict the way the user chose.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub async fn resolve_conflict(
        &self,
        session: &mut CheckoutSession,
        resolution: ConflictResolution,
    ) -> Result<(), CheckoutError> {
        if session.phase != CheckoutPhase::Conflict {
            return Ok(());
        }
        match resolution {
            ConflictResolution::ClearCart => {
                self.cart.clear().await?;
                session.cart.items.clear();
                session.cart.branch_id = None;
                self.events
                    .send_or_log(Event::CartCleared {
                        reason: "branch conflict resolved".into(),
                    })
                    .await;
            }
            ConflictResolution::SwitchBranch(branch) => {
                session.branch = branch;
            }
        }
        session.phase = CheckoutPhase::Idle;
        self.refresh_quote(session).await;
        Ok(())
    }

    pub async fn apply_coupon(
        &self,
        session: &mut CheckoutSession,
        code: &str,
    ) -> Result<Coupon, CheckoutError> {
        let coupon = self.coupons.apply(&mut session.coupon, code).await?;
        self.refresh_quote(session).await;
        Ok(coupon)
    }

    pub async fn remove_coupon(&self, session: &mut CheckoutSession) -> Option<Coupon> {
        let removed = self.coupons.remove(&mut session.coupon).await;
        if removed.is_some() {
            self.refresh_quote(session).await;
        }
        removed
    }

    /// Quantity changes are routed through the cart's owning collaborator,
    /// then the local view and the price are refreshed.
    pub async fn change_quantity(
        &self,
        session: &mut CheckoutSession,
        item_id: &str,
        delta: i64,
    ) -> Result<(), CheckoutError> {
        self.cart.change_quantity(item_id, delta).await?;
        self.cart_changed(session).await
    }

    pub async fn remove_item(
        &self,
        session: &mut CheckoutSession,
        item_id: &str,
    ) -> Result<(), CheckoutError> {
        self.cart.remove_item(item_id).await?;
        self.cart_changed(session).await
    }

    /// External notification that the cart changed: re-read and reprice.
    pub async fn cart_changed(&self, session: &mut CheckoutSession) -> Result<(), CheckoutError> {
        session.cart = self.cart.authoritative_cart().await?;
        self.refresh_quote(session).await;
        Ok(())
    }

    /// External notification that the selected address changed: re-read the
    /// repository and reprice.
    pub async fn address_changed(
        &self,
        session: &mut CheckoutSession,
    ) -> Result<(), CheckoutError> {
        session.address = self.addresses.selected_address().await?;
        session.saved_addresses = self.addresses.saved_addresses().await?;
        self.refresh_quote(session).await;
        Ok(())
    }

    async fn fail(&self, session: &mut CheckoutSession, err: &CheckoutError) {
        match err {
            CheckoutError::Conflict(_) => {
                session.phase = CheckoutPhase::Conflict;
                self.events
                    .notify(
                        "Your cart belongs to a different branch",
                        Severity::Warning,
                    )
                    .await;
            }
            _ => {
                session.phase = CheckoutPhase::Failed {
                    reason: err.user_message(),
                    retryable: err.is_retryable(),
                };
                self.events.notify(err.user_message(), Severity::Error).await;
            }
        }
    }
}
