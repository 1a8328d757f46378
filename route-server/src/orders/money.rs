//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored as `f64` major units; every calculation goes through
//! `Decimal` and is rounded to 2 places before converting back.

use rust_decimal::prelude::*;
use shared::error::{AppError, AppResult};
use shared::models::OrderItem;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i64 = 9999;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{field_name} must be a finite number, got {value}"
        )));
    }
    Ok(())
}

/// Validate a line item before it is priced
pub fn validate_item(item: &OrderItem) -> AppResult<()> {
    require_finite(item.unit_price, "unitPrice")?;
    if item.unit_price < 0.0 {
        return Err(AppError::validation(format!(
            "unitPrice must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "unitPrice exceeds maximum allowed ({MAX_PRICE}), got {}",
            item.unit_price
        )));
    }

    if item.quantity <= 0 {
        return Err(AppError::validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {}",
            item.quantity
        )));
    }
    Ok(())
}

pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Σ quantity × unitPrice
pub fn order_total(items: &[OrderItem]) -> f64 {
    let total: Decimal = items
        .iter()
        .map(|item| to_decimal(item.unit_price) * Decimal::from(item.quantity))
        .sum();
    to_f64(total)
}

/// Major units → minor units (×100), rounded to 2 places first
pub fn to_minor_units(amount: f64) -> AppResult<i64> {
    require_finite(amount, "price")?;
    (to_decimal(amount)
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| AppError::validation(format!("price out of range: {amount}")))
}

/// Minor units → major units
pub fn from_minor_units(minor: i64) -> f64 {
    to_f64(Decimal::new(minor, DECIMAL_PLACES))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_price: f64) -> OrderItem {
        OrderItem {
            book_id: 1,
            title: "Dune".into(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_order_total_is_exact() {
        // 0.1 * 3 在 f64 下是 0.30000000000000004
        assert_eq!(order_total(&[item(3, 0.1)]), 0.3);
        assert_eq!(order_total(&[item(2, 350.0), item(1, 19.99)]), 719.99);
        assert_eq!(order_total(&[]), 0.0);
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(700.0).unwrap(), 70000);
        assert_eq!(to_minor_units(19.99).unwrap(), 1999);
        assert!(to_minor_units(f64::NAN).is_err());
        assert_eq!(from_minor_units(70000), 700.0);
        assert_eq!(from_minor_units(1999), 19.99);
    }

    #[test]
    fn test_validate_item() {
        assert!(validate_item(&item(1, 0.0)).is_ok());
        assert!(validate_item(&item(0, 10.0)).is_err());
        assert!(validate_item(&item(1, -1.0)).is_err());
        assert!(validate_item(&item(1, f64::INFINITY)).is_err());
        assert!(validate_item(&item(10_000, 1.0)).is_err());
    }
}
