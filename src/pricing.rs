//! Checkout arithmetic. Pure functions only; storage is never touched here.
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use serde::Serialize;

use crate::config::ShopConfig;
use crate::error::Result;
use crate::error::ShopError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutLine {
    pub product_id: i32,
    pub name:       String,
    pub quantity:   i32,
    pub unit_price: Decimal,
}

impl CheckoutLine {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// What the calculator needs to know about a customer's past orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderHistory {
    pub completed_orders: u64,
}

impl OrderHistory {
    pub fn is_first_order(&self) -> bool {
        self.completed_orders == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub subtotal:        Decimal,
    pub delivery_fee:    Decimal,
    pub discount:        Decimal,
    pub discount_reason: Option<String>,
    pub grand_total:     Decimal,
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// garde rule for prices, fees and caps.
pub fn non_negative(value: &Decimal, _: &()) -> garde::Result {
    if value.is_sign_negative() && !value.is_zero() {
        Err(garde::Error::new(format!("{value} must not be negative")))
    }
    else {
        Ok(())
    }
}

pub fn non_negative_opt(value: &Option<Decimal>, ctx: &()) -> garde::Result {
    value.as_ref().map_or(Ok(()), |v| non_negative(v, ctx))
}

/// Subtotal, flat delivery fee and the capped first-order discount for a non-empty list of lines.
pub fn compute_checkout(config: &ShopConfig, lines: &[CheckoutLine], history: OrderHistory) -> Result<CheckoutSummary> {
    if lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    let subtotal: Decimal = lines.iter().map(CheckoutLine::total).sum();
    let delivery_fee = config.delivery_fee;

    let (discount, discount_reason) = if history.is_first_order() && subtotal > Decimal::ZERO {
        let raw = round_money(subtotal * config.first_order_discount_rate);
        (raw.min(config.first_order_discount_cap), Some(config.discount_reason()))
    }
    else {
        (Decimal::ZERO, None)
    };

    Ok(CheckoutSummary {
        subtotal,
        delivery_fee,
        discount,
        discount_reason,
        grand_total: subtotal + delivery_fee - discount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, price: Decimal, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            product_id: id,
            name: format!("Product {id}"),
            quantity,
            unit_price: price,
        }
    }

    #[test]
    fn first_order_gets_ten_percent_off() {
        let config = ShopConfig::default();
        let lines = [line(1, Decimal::new(4500, 2), 2), line(2, Decimal::new(6000, 2), 1)];
        let summary = compute_checkout(&config, &lines, OrderHistory::default()).unwrap();

        assert_eq!(summary.subtotal, Decimal::new(15000, 2));
        assert_eq!(summary.discount, Decimal::new(1500, 2));
        assert_eq!(summary.delivery_fee, Decimal::new(5000, 2));
        assert_eq!(summary.grand_total, Decimal::new(18500, 2));
        assert_eq!(
            summary.discount_reason.as_deref(),
            Some("First-time order 10% discount (max 200.00)")
        );
    }

    #[test]
    fn discount_is_capped() {
        let config = ShopConfig::default();
        let lines = [line(1, Decimal::new(45000, 2), 10)];
        let summary = compute_checkout(&config, &lines, OrderHistory::default()).unwrap();

        assert_eq!(summary.subtotal, Decimal::new(450000, 2));
        assert_eq!(summary.discount, Decimal::new(20000, 2));
        assert_eq!(summary.grand_total, Decimal::new(435000, 2));
    }

    #[test]
    fn returning_customer_pays_full_price() {
        let config = ShopConfig::default();
        let lines = [line(1, Decimal::new(4500, 2), 2)];
        let summary = compute_checkout(&config, &lines, OrderHistory { completed_orders: 1 }).unwrap();

        assert_eq!(summary.discount, Decimal::ZERO);
        assert!(summary.discount_reason.is_none());
        assert_eq!(summary.grand_total, Decimal::new(14000, 2));
    }

    #[test]
    fn discount_rounds_half_up() {
        let config = ShopConfig::default();
        // 10% of 0.25 is 0.025
        let lines = [line(1, Decimal::new(25, 2), 1)];
        let summary = compute_checkout(&config, &lines, OrderHistory::default()).unwrap();
        assert_eq!(summary.discount, Decimal::new(3, 2));
    }

    #[test]
    fn free_items_get_no_discount() {
        let config = ShopConfig::default();
        let lines = [line(1, Decimal::ZERO, 3)];
        let summary = compute_checkout(&config, &lines, OrderHistory::default()).unwrap();
        assert_eq!(summary.discount, Decimal::ZERO);
        assert_eq!(summary.grand_total, config.delivery_fee);
    }

    #[test]
    fn totals_hold_across_cart_sizes() {
        let config = ShopConfig::default();
        for quantity in 1..=60 {
            for completed_orders in [0, 3] {
                let lines = [line(1, Decimal::new(3799, 2), quantity), line(2, Decimal::new(12050, 2), 1)];
                let summary = compute_checkout(&config, &lines, OrderHistory { completed_orders }).unwrap();
                assert_eq!(
                    summary.grand_total,
                    summary.subtotal + Decimal::new(5000, 2) - summary.discount
                );
                assert!(summary.discount <= Decimal::new(20000, 2));
            }
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = compute_checkout(&ShopConfig::default(), &[], OrderHistory::default()).unwrap_err();
        assert!(matches!(err, ShopError::EmptyCart));
    }
}
