use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Geographic point. Required on an address before it can be priced against
/// or checked for serviceability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A delivery address as persisted by the address book collaborator.
///
/// `address` is the free-form text the user entered; the structured fields
/// are derived from it and may be absent. Exactly one address is selected at
/// a time, tracked outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DeliveryAddress {
    pub fn new(address: impl Into<String>, coordinates: Option<Coordinates>) -> Self {
        Self {
            address: address.into(),
            formatted_address: None,
            coordinates,
            pincode: None,
            city: None,
            state: None,
            landmark: None,
            label: None,
        }
    }

    /// Identifier handed to the pricing service. The saved label is the
    /// stable key when present; otherwise the raw address text.
    pub fn identifier(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.address)
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// A line in the cart. Owned by the cart collaborator; read-only here except
/// via quantity-change requests routed through the checkout service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The cart as the owning collaborator reports it: the items plus the
/// seller branch the cart is bound to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }
}

// Line-item labels as they appear on a price breakdown. The summary view
// only ever shows labels from SUMMARY_LINE_LABELS; the remaining components
// are computed and counted toward the total but never displayed.
pub const LABEL_GST: &str = "GST";
pub const LABEL_PLATFORM_FEE: &str = "Platform Fee";
pub const LABEL_PLATFORM_FEE_TAX: &str = "Platform Fee Tax";
pub const LABEL_PACKAGING: &str = "Packaging Charges";
pub const LABEL_PACKAGING_TAX: &str = "Packaging Tax";
pub const LABEL_DELIVERY_FEE: &str = "Delivery Fee";
pub const LABEL_DELIVERY_TAX: &str = "Delivery Tax";
pub const LABEL_DELIVERY_TIP: &str = "Delivery Tip";

pub const SUMMARY_LINE_LABELS: &[&str] = &[
    LABEL_GST,
    LABEL_PLATFORM_FEE,
    LABEL_PACKAGING,
    LABEL_DELIVERY_FEE,
    LABEL_DELIVERY_TIP,
];

/// One labelled amount on a price breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLine {
    pub label: String,
    pub amount: Decimal,
}

impl PriceLine {
    pub fn new(label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// Itemized decomposition of what the user is about to pay.
///
/// `taxes` and `delivery` hold every non-zero component, including the ones
/// the summary never displays; `grand_total` is the remote-computed total
/// when the pricing service supplied one, otherwise the sum of the parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub taxes: Vec<PriceLine>,
    pub delivery: Vec<PriceLine>,
    pub discount: Decimal,
    pub grand_total: Decimal,
    pub free_shipping: bool,
}

impl PriceBreakdown {
    /// Breakdown for an empty cart or an unpriceable address.
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            taxes: Vec::new(),
            delivery: Vec::new(),
            discount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            free_shipping: false,
        }
    }

    pub fn tax_total(&self) -> Decimal {
        self.taxes.iter().map(|l| l.amount).sum()
    }

    pub fn delivery_total(&self) -> Decimal {
        self.delivery.iter().map(|l| l.amount).sum()
    }

    /// Total recomputed from the parts. Matches `grand_total` unless the
    /// remote service supplied an authoritative figure of its own.
    pub fn computed_total(&self) -> Decimal {
        self.subtotal + self.tax_total() + self.delivery_total() - self.discount
    }

    /// Tax lines the order summary is allowed to display.
    pub fn summary_taxes(&self) -> Vec<&PriceLine> {
        self.taxes
            .iter()
            .filter(|l| SUMMARY_LINE_LABELS.contains(&l.label.as_str()))
            .collect()
    }

    /// Delivery lines the order summary is allowed to display.
    pub fn summary_delivery(&self) -> Vec<&PriceLine> {
        self.delivery
            .iter()
            .filter(|l| SUMMARY_LINE_LABELS.contains(&l.label.as_str()))
            .collect()
    }
}

/// An applied discount code. At most one may be active; applying another
/// requires removing this one first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: Decimal,
    pub description: String,
}

pub const ORDER_TYPE_DELIVERY: &str = "delivery";
pub const PAYMENT_CHANNEL_ONLINE: &str = "online";

/// One item of an order payload, taken from the authoritative cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            item_id: item.id.clone(),
            quantity: item.quantity,
            variant: item.variant.clone(),
            addons: item.addons.clone(),
            options: item.options.clone(),
        }
    }
}

/// The authoritative order request sent to the order service.
///
/// Built from a freshly fetched cart, never from the in-memory view, and
/// exactly once per placement attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub branch_id: String,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub coupon_code: String,
    pub tip: Decimal,
    pub order_type: String,
    pub payment_channel: String,
}

impl OrderPayload {
    pub fn from_cart(
        branch_id: &str,
        cart: &CartSnapshot,
        address: &DeliveryAddress,
        coupon: Option<&Coupon>,
        tip: Decimal,
    ) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            items: cart.items.iter().map(OrderItem::from).collect(),
            delivery_address: address.clone(),
            coupon_code: coupon.map(|c| c.code.clone()).unwrap_or_default(),
            tip,
            order_type: ORDER_TYPE_DELIVERY.to_string(),
            payment_channel: PAYMENT_CHANNEL_ONLINE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentSessionStatus {
    Initiated,
    Succeeded,
    Failed,
    Cancelled,
}

/// One external payment-provider transaction context, tied to one order.
/// Amounts are integer minor-currency units, per the gateway contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub order_id: String,
    pub gateway_session_id: String,
    pub amount_minor: i64,
    pub status: PaymentSessionStatus,
    pub initiated_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn initiated(order_id: String, gateway_session_id: String, amount_minor: i64) -> Self {
        Self {
            order_id,
            gateway_session_id,
            amount_minor,
            status: PaymentSessionStatus::Initiated,
            initiated_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PaymentSessionStatus::Initiated
    }
}

/// The fixed catalog of payment methods offered on the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Card,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub const fn catalog() -> &'static [PaymentMethod] {
        &[
            PaymentMethod::Upi,
            PaymentMethod::Card,
            PaymentMethod::NetBanking,
            PaymentMethod::Wallet,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_breakdown() -> PriceBreakdown {
        PriceBreakdown {
            subtotal: dec!(500),
            taxes: vec![
                PriceLine::new(LABEL_GST, dec!(25)),
                PriceLine::new(LABEL_PLATFORM_FEE, dec!(5)),
                PriceLine::new(LABEL_PLATFORM_FEE_TAX, dec!(0.90)),
                PriceLine::new(LABEL_PACKAGING_TAX, dec!(1.10)),
            ],
            delivery: vec![
                PriceLine::new(LABEL_DELIVERY_FEE, dec!(30)),
                PriceLine::new(LABEL_DELIVERY_TAX, dec!(5.40)),
            ],
            discount: dec!(10),
            grand_total: dec!(557.40),
            free_shipping: false,
        }
    }

    #[test]
    fn totals_add_up_across_all_lines() {
        let b = sample_breakdown();
        assert_eq!(b.computed_total(), b.grand_total);
    }

    #[test]
    fn summary_hides_internal_fee_taxes() {
        let b = sample_breakdown();

        let tax_labels: Vec<&str> = b.summary_taxes().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(tax_labels, vec![LABEL_GST, LABEL_PLATFORM_FEE]);

        let delivery_labels: Vec<&str> = b
            .summary_delivery()
            .iter()
            .map(|l| l.label.as_str())
            .collect();
        assert_eq!(delivery_labels, vec![LABEL_DELIVERY_FEE]);

        // Hidden components still count toward the total.
        assert_eq!(b.computed_total(), dec!(557.40));
    }

    #[test]
    fn order_payload_carries_cart_and_constants() {
        let cart = CartSnapshot {
            branch_id: Some("branch-1".into()),
            items: vec![CartItem {
                id: "item-1".into(),
                name: "Veg Thali".into(),
                quantity: 2,
                unit_price: dec!(120),
                variant: Some("large".into()),
                addons: vec!["extra roti".into()],
                options: None,
            }],
        };
        let address = DeliveryAddress::new(
            "12 MG Road",
            Some(Coordinates {
                latitude: 12.97,
                longitude: 77.59,
            }),
        );

        let payload = OrderPayload::from_cart("branch-1", &cart, &address, None, Decimal::ZERO);

        assert_eq!(payload.order_type, ORDER_TYPE_DELIVERY);
        assert_eq!(payload.payment_channel, PAYMENT_CHANNEL_ONLINE);
        assert_eq!(payload.coupon_code, "");
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].quantity, 2);
        assert_eq!(payload.items[0].variant.as_deref(), Some("large"));
    }

    #[test]
    fn address_identifier_prefers_saved_label() {
        let mut address = DeliveryAddress::new("12 MG Road", None);
        assert_eq!(address.identifier(), "12 MG Road");

        address.label = Some("home".into());
        assert_eq!(address.identifier(), "home");
    }

    #[test]
    fn cart_subtotal_multiplies_quantity() {
        let cart = CartSnapshot {
            branch_id: None,
            items: vec![
                CartItem {
                    id: "a".into(),
                    name: "Idli".into(),
                    quantity: 3,
                    unit_price: dec!(40),
                    variant: None,
                    addons: vec![],
                    options: None,
                },
                CartItem {
                    id: "b".into(),
                    name: "Dosa".into(),
                    quantity: 1,
                    unit_price: dec!(80),
                    variant: None,
                    addons: vec![],
                    options: None,
                },
            ],
        };
        assert_eq!(cart.subtotal(), dec!(200));
    }
}
