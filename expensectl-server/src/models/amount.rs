//! Decimal field validation
//!
//! Mirrors the column types: money is NUMERIC(10,2), counts and servings
//! are NUMERIC(10,3).

use rust_decimal::Decimal;

use super::ValidationError;

fn check_decimal(
    field: &'static str,
    value: Decimal,
    max_scale: u32,
    max_digits: u32,
) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "must not be negative",
        });
    }
    let normalized = value.normalize();
    if normalized.scale() > max_scale {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "has too many decimal places",
        });
    }
    let int_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;
    if int_digits > max_digits - max_scale {
        return Err(ValidationError::OutOfRange {
            field,
            reason: "is too large",
        });
    }
    Ok(normalized)
}

/// Money amount: non-negative, at most 2 decimal places
pub fn validate_money(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    check_decimal(field, value, 2, 10)
}

/// Item count: positive, at most 3 decimal places
pub fn validate_count(value: Decimal) -> Result<Decimal, ValidationError> {
    let count = check_decimal("count", value, 3, 10)?;
    if count.is_zero() {
        return Err(ValidationError::OutOfRange {
            field: "count",
            reason: "must be greater than zero",
        });
    }
    Ok(count)
}

/// Serving size: non-negative, at most 3 decimal places
pub fn validate_serving(value: Decimal) -> Result<Decimal, ValidationError> {
    check_decimal("serving", value, 3, 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn money_precision() {
        assert_eq!(validate_money("amount", d("12.50")).unwrap(), d("12.5"));
        assert!(validate_money("amount", d("1.001")).is_err());
        assert!(validate_money("amount", d("-1")).is_err());
        assert!(validate_money("amount", d("99999999.99")).is_ok());
        assert!(validate_money("amount", d("100000000")).is_err());
    }

    #[test]
    fn count_must_be_positive() {
        assert!(validate_count(d("0")).is_err());
        assert!(validate_count(d("0.125")).is_ok());
        assert!(validate_count(d("0.1255")).is_err());
    }

    #[test]
    fn trailing_zeros_do_not_count() {
        assert!(validate_money("amount", d("3.1000")).is_ok());
    }
}
