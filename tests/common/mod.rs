//! Shared test harness: hand-rolled fakes for every collaborator and a
//! fully wired `CheckoutService`.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;

use storefront_checkout::{
    collaborators::{
        AddressRepository, AuthProvider, CartApi, CouponApi, CreateOrderResponse, GatewayCallback,
        GatewayPrefill, OrderApi, PaymentApi, PaymentProof, PaymentSessionDraft, PricingApi,
        RemoteQuote,
    },
    config::FallbackPricing,
    errors::CheckoutError,
    events::EventSender,
    models::{CartItem, CartSnapshot, Coordinates, Coupon, DeliveryAddress, OrderPayload},
    services::{
        checkout::{BranchContext, CheckoutService},
        coupons::CouponApplier,
        orders::OrderPlacementService,
        payments::PaymentGatewayAdapter,
        pricing::PricingCalculator,
    },
};

pub const BRANCH: &str = "branch-1";
pub const OTHER_BRANCH: &str = "branch-2";

pub fn branch_coordinates() -> Coordinates {
    Coordinates {
        latitude: 12.9716,
        longitude: 77.5946,
    }
}

pub fn nearby_coordinates() -> Coordinates {
    Coordinates {
        latitude: 12.9810,
        longitude: 77.6000,
    }
}

pub fn faraway_coordinates() -> Coordinates {
    Coordinates {
        latitude: 13.1986,
        longitude: 77.7066,
    }
}

pub fn browsing_branch() -> BranchContext {
    BranchContext {
        branch_id: BRANCH.to_string(),
        coordinates: Some(branch_coordinates()),
        service_radius_km: Some(10.0),
    }
}

pub fn nearby_address() -> DeliveryAddress {
    DeliveryAddress::new("12 MG Road", Some(nearby_coordinates()))
}

pub fn faraway_address() -> DeliveryAddress {
    DeliveryAddress::new("Airport Road", Some(faraway_coordinates()))
}

pub fn default_cart() -> CartSnapshot {
    CartSnapshot {
        branch_id: Some(BRANCH.to_string()),
        items: vec![
            CartItem {
                id: "item-1".into(),
                name: "Paneer Roll".into(),
                quantity: 4,
                unit_price: dec!(100),
                variant: None,
                addons: vec![],
                options: None,
            },
            CartItem {
                id: "item-2".into(),
                name: "Lassi".into(),
                quantity: 2,
                unit_price: dec!(50),
                variant: Some("sweet".into()),
                addons: vec![],
                options: None,
            },
        ],
    }
}

// ==================== Collaborator Fakes ====================

pub struct FakePricing {
    pub quote: Mutex<Option<RemoteQuote>>,
    pub calls: AtomicUsize,
    pub last_coupon: Mutex<Option<String>>,
}

impl FakePricing {
    pub fn with_quote(quote: RemoteQuote) -> Self {
        Self {
            quote: Mutex::new(Some(quote)),
            calls: AtomicUsize::new(0),
            last_coupon: Mutex::new(None),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            quote: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_coupon: Mutex::new(None),
        }
    }

    pub fn default_quote() -> RemoteQuote {
        serde_json::from_value(json!({
            "subTotal": "500",
            "totalTax": "25",
            "deliveryCharge": "30",
            "grandTotal": "555"
        }))
        .expect("static quote")
    }
}

#[async_trait]
impl PricingApi for FakePricing {
    async fn calculate_cart(
        &self,
        _address_id: &str,
        coupon_code: Option<String>,
    ) -> Result<RemoteQuote, CheckoutError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coupon.lock().unwrap() = coupon_code;
        match self.quote.lock().unwrap().clone() {
            Some(quote) => Ok(quote),
            None => Err(CheckoutError::RemoteService("connection refused".into())),
        }
    }
}

pub struct FakeCoupons {
    pub known: Mutex<Vec<Coupon>>,
}

impl FakeCoupons {
    pub fn with(coupons: Vec<Coupon>) -> Self {
        Self {
            known: Mutex::new(coupons),
        }
    }
}

#[async_trait]
impl CouponApi for FakeCoupons {
    async fn validate(&self, code: &str) -> Result<Option<Coupon>, CheckoutError> {
        Ok(self
            .known
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }
}

pub struct FakeOrders {
    pub response: Mutex<serde_json::Value>,
    pub calls: AtomicUsize,
    pub last_payload: Mutex<Option<OrderPayload>>,
}

impl FakeOrders {
    pub fn returning(response: serde_json::Value) -> Self {
        Self {
            response: Mutex::new(response),
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }
}

#[async_trait]
impl OrderApi for FakeOrders {
    async fn create_order(
        &self,
        payload: &OrderPayload,
    ) -> Result<CreateOrderResponse, CheckoutError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        let value = self.response.lock().unwrap().clone();
        serde_json::from_value(value).map_err(|e| CheckoutError::RemoteService(e.to_string()))
    }
}

pub struct FakePayments {
    pub verify_ok: AtomicBool,
    pub initiate_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl FakePayments {
    pub fn verifying(ok: bool) -> Self {
        Self {
            verify_ok: AtomicBool::new(ok),
            initiate_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentApi for FakePayments {
    async fn initiate_payment(
        &self,
        _order_id: &str,
    ) -> Result<PaymentSessionDraft, CheckoutError> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentSessionDraft {
            gateway_session_id: "gw_1".into(),
            amount: 55500,
        })
    }

    async fn verify_payment(&self, _proof: &PaymentProof) -> Result<bool, CheckoutError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verify_ok.load(Ordering::SeqCst))
    }
}

pub struct FakeGateway {
    pub callback: Mutex<GatewayCallback>,
    pub opens: AtomicUsize,
}

impl FakeGateway {
    pub fn completing() -> Self {
        Self {
            callback: Mutex::new(GatewayCallback::Completed(PaymentProof {
                order_ref: "ord_123".into(),
                payment_ref: "pay_1".into(),
                signature: "sig".into(),
            })),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn cancelling() -> Self {
        let gateway = Self::completing();
        *gateway.callback.lock().unwrap() = GatewayCallback::Cancelled;
        gateway
    }
}

#[async_trait]
impl storefront_checkout::collaborators::PaymentGateway for FakeGateway {
    async fn open(
        &self,
        _gateway_session_id: &str,
        _amount_minor: i64,
        _prefill: &GatewayPrefill,
    ) -> Result<GatewayCallback, CheckoutError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.callback.lock().unwrap().clone())
    }
}

pub struct FakeAuth {
    pub authenticated: AtomicBool,
    pub session_valid: AtomicBool,
    pub login_requests: AtomicUsize,
    pub credentials_cleared: AtomicBool,
}

impl FakeAuth {
    pub fn logged_in() -> Self {
        Self {
            authenticated: AtomicBool::new(true),
            session_valid: AtomicBool::new(true),
            login_requests: AtomicUsize::new(0),
            credentials_cleared: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn validate_session(&self) -> Result<(), CheckoutError> {
        if self.session_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CheckoutError::Auth("session invalid".into()))
        }
    }

    fn request_login(&self) {
        self.login_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn clear_credentials(&self) {
        self.credentials_cleared.store(true, Ordering::SeqCst);
    }
}

pub struct FakeCart {
    pub snapshot: Mutex<CartSnapshot>,
    pub cleared: AtomicBool,
}

impl FakeCart {
    pub fn holding(snapshot: CartSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            cleared: AtomicBool::new(false),
        }
    }

    pub fn items_len(&self) -> usize {
        self.snapshot.lock().unwrap().items.len()
    }
}

#[async_trait]
impl CartApi for FakeCart {
    async fn authoritative_cart(&self) -> Result<CartSnapshot, CheckoutError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn change_quantity(&self, item_id: &str, delta: i64) -> Result<(), CheckoutError> {
        let mut snapshot = self.snapshot.lock().unwrap();
        if let Some(item) = snapshot.items.iter_mut().find(|i| i.id == item_id) {
            let quantity = i64::from(item.quantity) + delta;
            item.quantity = u32::try_from(quantity.max(0))
                .map_err(|_| CheckoutError::Validation("quantity out of range".into()))?;
        }
        snapshot.items.retain(|i| i.quantity > 0);
        Ok(())
    }

    async fn remove_item(&self, item_id: &str) -> Result<(), CheckoutError> {
        self.snapshot
            .lock()
            .unwrap()
            .items
            .retain(|i| i.id != item_id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CheckoutError> {
        let mut snapshot = self.snapshot.lock().unwrap();
        snapshot.items.clear();
        snapshot.branch_id = None;
        self.cleared.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeAddresses {
    pub selected: Mutex<Option<DeliveryAddress>>,
    pub recorded: Mutex<Vec<DeliveryAddress>>,
}

impl FakeAddresses {
    pub fn selecting(address: Option<DeliveryAddress>) -> Self {
        Self {
            selected: Mutex::new(address),
            recorded: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AddressRepository for FakeAddresses {
    async fn selected_address(&self) -> Result<Option<DeliveryAddress>, CheckoutError> {
        Ok(self.selected.lock().unwrap().clone())
    }

    async fn saved_addresses(&self) -> Result<Vec<DeliveryAddress>, CheckoutError> {
        Ok(self.selected.lock().unwrap().iter().cloned().collect())
    }

    async fn record_selected(&self, address: &DeliveryAddress) -> Result<(), CheckoutError> {
        self.recorded.lock().unwrap().push(address.clone());
        Ok(())
    }
}

// ==================== Harness ====================

/// A fully wired checkout service over fakes, with handles kept for
/// assertions.
pub struct Harness {
    pub pricing: Arc<FakePricing>,
    pub coupons: Arc<FakeCoupons>,
    pub orders: Arc<FakeOrders>,
    pub payments: Arc<FakePayments>,
    pub gateway: Arc<FakeGateway>,
    pub auth: Arc<FakeAuth>,
    pub cart: Arc<FakeCart>,
    pub addresses: Arc<FakeAddresses>,
    pub service: CheckoutService,
}

impl Harness {
    /// Everything in order: nearby address selected, matching branches,
    /// reachable pricing, verifiable payment.
    pub fn happy() -> Self {
        Self::build(
            FakePricing::with_quote(FakePricing::default_quote()),
            FakeOrders::returning(json!({ "order": "ord_123" })),
            FakePayments::verifying(true),
            FakeGateway::completing(),
            FakeCart::holding(default_cart()),
            FakeAddresses::selecting(Some(nearby_address())),
        )
    }

    pub fn build(
        pricing: FakePricing,
        orders: FakeOrders,
        payments: FakePayments,
        gateway: FakeGateway,
        cart: FakeCart,
        addresses: FakeAddresses,
    ) -> Self {
        let pricing = Arc::new(pricing);
        let coupons = Arc::new(FakeCoupons::with(vec![Coupon {
            code: "SAVE10".into(),
            discount: dec!(10),
            description: "10 off your order".into(),
        }]));
        let orders = Arc::new(orders);
        let payments = Arc::new(payments);
        let gateway = Arc::new(gateway);
        let auth = Arc::new(FakeAuth::logged_in());
        let cart = Arc::new(cart);
        let addresses = Arc::new(addresses);
        let events = EventSender::discarding();

        let calculator = PricingCalculator::new(pricing.clone(), FallbackPricing::default());
        let applier = CouponApplier::new(coupons.clone(), events.clone());
        let placement = OrderPlacementService::new(
            auth.clone(),
            cart.clone(),
            orders.clone(),
            payments.clone(),
            addresses.clone(),
            events.clone(),
        );
        let adapter =
            PaymentGatewayAdapter::new(gateway.clone(), payments.clone(), events.clone());
        let service = CheckoutService::new(
            calculator,
            applier,
            placement,
            adapter,
            cart.clone(),
            addresses.clone(),
            events,
        );

        Self {
            pricing,
            coupons,
            orders,
            payments,
            gateway,
            auth,
            cart,
            addresses,
            service,
        }
    }
}
