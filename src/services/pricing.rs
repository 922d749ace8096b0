use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::{
    collaborators::{PricingApi, RemoteQuote},
    config::FallbackPricing,
    models::{
        CartItem, Coupon, DeliveryAddress, PriceBreakdown, PriceLine, LABEL_DELIVERY_FEE,
        LABEL_DELIVERY_TAX, LABEL_DELIVERY_TIP, LABEL_GST, LABEL_PACKAGING, LABEL_PACKAGING_TAX,
        LABEL_PLATFORM_FEE, LABEL_PLATFORM_FEE_TAX,
    },
};

/// Derives the price breakdown for the current cart, address, and coupon.
///
/// Remote quotes are authoritative; on remote failure a deterministic local
/// estimate takes over. Every change to the calculator's inputs must go
/// through [`PricingCalculator::invalidate`], which bumps a generation
/// counter; a calculation that resolves after a newer invalidation is
/// discarded so a slow stale response can never overwrite a fresher one.
#[derive(Clone)]
pub struct PricingCalculator {
    api: Arc<dyn PricingApi>,
    fallback: FallbackPricing,
    generation: Arc<AtomicU64>,
}

impl PricingCalculator {
    pub fn new(api: Arc<dyn PricingApi>, fallback: FallbackPricing) -> Self {
        Self {
            api,
            fallback,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Marks every in-flight calculation stale. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Computes a breakdown for the given inputs.
    ///
    /// Returns `None` when the inputs changed while the calculation was in
    /// flight; the caller must drop the result and wait for the calculation
    /// started by the newer change.
    #[instrument(skip_all, fields(items = items.len(), coupon = coupon.map(|c| c.code.as_str())))]
    pub async fn calculate(
        &self,
        address: Option<&DeliveryAddress>,
        coupon: Option<&Coupon>,
        items: &[CartItem],
    ) -> Option<PriceBreakdown> {
        let generation = self.current_generation();
        let breakdown = self.compute(address, coupon, items).await;

        if self.current_generation() != generation {
            debug!(generation, "discarding superseded price calculation");
            return None;
        }
        Some(breakdown)
    }

    async fn compute(
        &self,
        address: Option<&DeliveryAddress>,
        coupon: Option<&Coupon>,
        items: &[CartItem],
    ) -> PriceBreakdown {
        let address = match address.filter(|a| a.has_coordinates()) {
            Some(address) => address,
            None => return PriceBreakdown::zero(),
        };
        if items.is_empty() {
            return PriceBreakdown::zero();
        }

        match self
            .api
            .calculate_cart(address.identifier(), coupon.map(|c| c.code.clone()))
            .await
        {
            Ok(quote) => breakdown_from_quote(quote),
            Err(err) => {
                warn!(error = %err, "pricing service unavailable, using local estimate");
                self.fallback_breakdown(items)
            }
        }
    }

    /// Deterministic local estimate: flat tax fraction on the subtotal, a
    /// fixed delivery fee on any non-empty cart, and no discount. Coupons
    /// require live pricing and are ignored here.
    fn fallback_breakdown(&self, items: &[CartItem]) -> PriceBreakdown {
        let subtotal: Decimal = items.iter().map(CartItem::line_total).sum();
        let tax = subtotal * self.fallback.tax_rate;
        let delivery_fee = if subtotal > Decimal::ZERO {
            self.fallback.delivery_fee
        } else {
            Decimal::ZERO
        };

        let mut taxes = Vec::new();
        push_line(&mut taxes, LABEL_GST, Some(tax));
        let mut delivery = Vec::new();
        push_line(&mut delivery, LABEL_DELIVERY_FEE, Some(delivery_fee));

        PriceBreakdown {
            subtotal,
            grand_total: subtotal + tax + delivery_fee,
            taxes,
            delivery,
            discount: Decimal::ZERO,
            free_shipping: false,
        }
    }
}

/// Maps a remote quote into the breakdown shape. Zero components are
/// omitted rather than shown as zero-amount lines; the grand total is the
/// remote figure when supplied, otherwise the sum of the parts.
fn breakdown_from_quote(quote: RemoteQuote) -> PriceBreakdown {
    let subtotal = quote.subtotal.unwrap_or_default();
    let discount = quote.discount.unwrap_or_default();

    let mut taxes = Vec::new();
    push_line(&mut taxes, LABEL_GST, quote.total_tax);
    push_line(&mut taxes, LABEL_PLATFORM_FEE, quote.platform_fee);
    push_line(&mut taxes, LABEL_PLATFORM_FEE_TAX, quote.platform_fee_tax);
    push_line(&mut taxes, LABEL_PACKAGING, quote.packaging_charges);
    push_line(&mut taxes, LABEL_PACKAGING_TAX, quote.packaging_charges_tax);

    let mut delivery = Vec::new();
    push_line(&mut delivery, LABEL_DELIVERY_FEE, quote.delivery_charge);
    push_line(&mut delivery, LABEL_DELIVERY_TAX, quote.delivery_tax);
    push_line(&mut delivery, LABEL_DELIVERY_TIP, quote.delivery_tip);

    let computed: Decimal = subtotal
        + taxes.iter().map(|l: &PriceLine| l.amount).sum::<Decimal>()
        + delivery.iter().map(|l: &PriceLine| l.amount).sum::<Decimal>()
        - discount;
    let grand_total = quote.grand_total.unwrap_or(computed);

    PriceBreakdown {
        subtotal,
        taxes,
        delivery,
        discount,
        grand_total,
        free_shipping: quote.is_free_shipping.unwrap_or(false),
    }
}

fn push_line(lines: &mut Vec<PriceLine>, label: &str, amount: Option<Decimal>) {
    if let Some(amount) = amount {
        if !amount.is_zero() {
            lines.push(PriceLine::new(label, amount));
        }
    }
}
