//! Trait seams for the external collaborators this core coordinates.
//!
//! Every collaborator is injected as an `Arc<dyn …>` so the services can be
//! exercised against fakes; the `clients` module provides the HTTP-backed
//! implementations used in production.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    errors::CheckoutError,
    models::{CartSnapshot, Coupon, DeliveryAddress, OrderPayload},
};

/// Quote returned by the remote pricing service. Every field may be absent;
/// absent means zero. Field names arrive in either camelCase or snake_case
/// depending on the service version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteQuote {
    #[serde(alias = "subTotal")]
    pub subtotal: Option<Decimal>,
    #[serde(alias = "totalTax", alias = "tax")]
    pub total_tax: Option<Decimal>,
    #[serde(alias = "platformFee")]
    pub platform_fee: Option<Decimal>,
    #[serde(alias = "platformFeeTax")]
    pub platform_fee_tax: Option<Decimal>,
    #[serde(alias = "packagingCharges")]
    pub packaging_charges: Option<Decimal>,
    #[serde(alias = "packagingChargesTax")]
    pub packaging_charges_tax: Option<Decimal>,
    #[serde(alias = "deliveryCharge", alias = "deliveryFee")]
    pub delivery_charge: Option<Decimal>,
    #[serde(alias = "deliveryTax")]
    pub delivery_tax: Option<Decimal>,
    #[serde(alias = "deliveryTip")]
    pub delivery_tip: Option<Decimal>,
    pub discount: Option<Decimal>,
    #[serde(alias = "grandTotal", alias = "total")]
    pub grand_total: Option<Decimal>,
    #[serde(alias = "isFreeShipping")]
    pub is_free_shipping: Option<bool>,
}

/// Remote pricing service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PricingApi: Send + Sync {
    async fn calculate_cart(
        &self,
        address_id: &str,
        coupon_code: Option<String>,
    ) -> Result<RemoteQuote, CheckoutError>;
}

/// Coupon validation endpoint. `None` means the code is unknown, expired, or
/// otherwise not applicable; transport failures are errors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CouponApi: Send + Sync {
    async fn validate(&self, code: &str) -> Result<Option<Coupon>, CheckoutError>;
}

/// Customer contact details embedded in an order-creation response, used to
/// prefill the payment gateway form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The order reference in an order-creation response: either a bare
/// identity or an embedded order object carrying `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderRef {
    Id(String),
    Embedded {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        customer: Option<CustomerContact>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrderResponse {
    pub order: Option<OrderRef>,
}

impl CreateOrderResponse {
    /// The created order's identity, from whichever shape the service used.
    pub fn order_id(&self) -> Option<&str> {
        match self.order.as_ref()? {
            OrderRef::Id(id) => Some(id),
            OrderRef::Embedded { id, .. } => Some(id),
        }
    }

    pub fn customer(&self) -> Option<&CustomerContact> {
        match self.order.as_ref()? {
            OrderRef::Id(_) => None,
            OrderRef::Embedded { customer, .. } => customer.as_ref(),
        }
    }
}

/// Order-creation service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(&self, payload: &OrderPayload)
        -> Result<CreateOrderResponse, CheckoutError>;
}

/// Draft returned by payment initiation: the gateway session to open and the
/// amount it will collect, in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSessionDraft {
    #[serde(alias = "gatewaySessionId")]
    pub gateway_session_id: String,
    #[serde(alias = "amountMinor")]
    pub amount: i64,
}

/// Reference triple the gateway hands back on a successful payment; the
/// verification service checks the signature against the other two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

/// Payment service: opens payment sessions against created orders and
/// verifies gateway callbacks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn initiate_payment(&self, order_id: &str)
        -> Result<PaymentSessionDraft, CheckoutError>;
    async fn verify_payment(&self, proof: &PaymentProof) -> Result<bool, CheckoutError>;
}

/// Contact details prefilled into the gateway's payment form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayPrefill {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&CustomerContact> for GatewayPrefill {
    fn from(contact: &CustomerContact) -> Self {
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// Terminal result of one gateway interaction, as reported by its callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCallback {
    Completed(PaymentProof),
    Cancelled,
    Failed(String),
}

/// The external payment gateway, wrapped behind a single async call so the
/// rest of the system reads as straight-line logic instead of callbacks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn open(
        &self,
        gateway_session_id: &str,
        amount_minor: i64,
        prefill: &GatewayPrefill,
    ) -> Result<GatewayCallback, CheckoutError>;
}

/// Authentication collaborator. `is_authenticated` is the cached flag;
/// `validate_session` is the live check order placement insists on.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
    async fn validate_session(&self) -> Result<(), CheckoutError>;
    fn request_login(&self);
    fn clear_credentials(&self);
}

/// The cart's owning collaborator. `authoritative_cart` always fetches the
/// persisted cart, never a cached copy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CartApi: Send + Sync {
    async fn authoritative_cart(&self) -> Result<CartSnapshot, CheckoutError>;
    async fn change_quantity(&self, item_id: &str, delta: i64) -> Result<(), CheckoutError>;
    async fn remove_item(&self, item_id: &str) -> Result<(), CheckoutError>;
    async fn clear(&self) -> Result<(), CheckoutError>;
}

/// Typed repository over the externally-persisted address records: the
/// currently selected delivery address and the saved-address list. This core
/// only ever writes through `record_selected`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn selected_address(&self) -> Result<Option<DeliveryAddress>, CheckoutError>;
    async fn saved_addresses(&self) -> Result<Vec<DeliveryAddress>, CheckoutError>;
    async fn record_selected(&self, address: &DeliveryAddress) -> Result<(), CheckoutError>;
}
