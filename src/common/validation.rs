// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

/// Largest value a `NUMERIC(10, 2)` price column holds.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Prices are stored with two decimals: non-negative, at most cents, within the column range.
pub fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("Value cannot be negative.".into());
        return Err(err);
    }
    if value.normalize().scale() > 2 {
        let mut err = ValidationError::new("precision");
        err.add_param("max_decimals".into(), &2);
        err.message = Some("Value cannot have more than 2 decimal places.".into());
        return Err(err);
    }
    if *value > MAX_UNIT_PRICE {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &MAX_UNIT_PRICE.to_string());
        err.message = Some("Value is too large.".into());
        return Err(err);
    }
    Ok(())
}
