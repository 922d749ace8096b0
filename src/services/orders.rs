use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::{
    collaborators::{AddressRepository, AuthProvider, CartApi, GatewayPrefill, OrderApi, PaymentApi},
    errors::CheckoutError,
    events::{Event, EventSender},
    models::{Coupon, DeliveryAddress, OrderPayload, PaymentSession},
};

/// Everything the orchestrator needs to know about the checkout attempt.
/// Borrowed from the session so the orchestrator stays decoupled from the
/// state machine's record type.
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub browsing_branch: &'a str,
    pub cart_branch: Option<&'a str>,
    pub address: Option<&'a DeliveryAddress>,
    pub coupon: Option<&'a Coupon>,
    pub tip: Decimal,
}

/// A successfully placed order, ready for the gateway.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    pub session: PaymentSession,
    pub prefill: GatewayPrefill,
}

/// Assembles the authoritative order payload and walks it through order
/// creation and payment initiation.
///
/// Guards run in a fixed order and each failure carries its specific
/// reason; nothing past a failed guard executes, so an aborted attempt
/// never opens a payment session.
#[derive(Clone)]
pub struct OrderPlacementService {
    auth: Arc<dyn AuthProvider>,
    cart: Arc<dyn CartApi>,
    orders: Arc<dyn OrderApi>,
    payments: Arc<dyn PaymentApi>,
    addresses: Arc<dyn AddressRepository>,
    events: EventSender,
}

impl OrderPlacementService {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        cart: Arc<dyn CartApi>,
        orders: Arc<dyn OrderApi>,
        payments: Arc<dyn PaymentApi>,
        addresses: Arc<dyn AddressRepository>,
        events: EventSender,
    ) -> Self {
        Self {
            auth,
            cart,
            orders,
            payments,
            addresses,
            events,
        }
    }

    #[instrument(skip(self, ctx), fields(branch = %ctx.browsing_branch))]
    pub async fn place_order(
        &self,
        ctx: PlacementContext<'_>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let address = ctx
            .address
            .filter(|a| a.has_coordinates())
            .ok_or_else(|| CheckoutError::Validation("address invalid".into()))?;

        if !self.auth.is_authenticated() {
            self.auth.request_login();
            return Err(CheckoutError::Auth("sign in to place the order".into()));
        }

        if let Some(cart_branch) = ctx.cart_branch {
            if cart_branch != ctx.browsing_branch {
                self.events
                    .send_or_log(Event::BranchConflict {
                        cart_branch: cart_branch.to_string(),
                        browsing_branch: ctx.browsing_branch.to_string(),
                    })
                    .await;
                return Err(CheckoutError::Conflict(
                    "cart belongs to a different branch".into(),
                ));
            }
        }

        // The cached flag passed; insist on a live check before committing.
        if let Err(err) = self.auth.validate_session().await {
            warn!(error = %err, "session validation failed, requesting login");
            self.auth.clear_credentials();
            if let Err(save_err) = self.addresses.record_selected(address).await {
                warn!(error = %save_err, "could not remember pending address");
            }
            self.auth.request_login();
            return Err(CheckoutError::Auth("session expired, sign in again".into()));
        }

        // The UI's cart copy may be stale; the order is built from the
        // persisted cart only.
        let cart = self.cart.authoritative_cart().await?;
        if cart.is_empty() {
            return Err(CheckoutError::Validation("cart is empty".into()));
        }

        let payload =
            OrderPayload::from_cart(ctx.browsing_branch, &cart, address, ctx.coupon, ctx.tip);

        let response = self.orders.create_order(&payload).await?;
        let order_id = response
            .order_id()
            .ok_or_else(|| CheckoutError::RemoteService("order creation failed".into()))?
            .to_string();
        let prefill = response
            .customer()
            .map(GatewayPrefill::from)
            .unwrap_or_default();

        info!(%order_id, "order created");
        self.events
            .send_or_log(Event::OrderCreated {
                order_id: order_id.clone(),
            })
            .await;

        let draft = self.payments.initiate_payment(&order_id).await?;
        let session =
            PaymentSession::initiated(order_id.clone(), draft.gateway_session_id, draft.amount);

        self.events
            .send_or_log(Event::PaymentInitiated {
                order_id: order_id.clone(),
                amount_minor: session.amount_minor,
            })
            .await;

        Ok(PlacedOrder {
            order_id,
            session,
            prefill,
        })
    }
}
