use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 unit = 100 cents, so a balance of 50.00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single transaction may carry, in cents (10^13 units).
/// Keeps every accepted amount exactly representable in an f64 mantissa.
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000_000_000;

/// Format cents as a human-readable decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    let units = abs_cents / 100;
    let remainder = abs_cents % 100;
    format!("{}{}.{:02}", sign, units, remainder)
}

/// Convert a decimal amount from the API into cents.
/// Example: 50.0 -> 5000, 12.34 -> 1234
///
/// Rejects anything that is not a whole number of cents: NaN, infinities,
/// zero and negative values, amounts below one cent, amounts above
/// `MAX_AMOUNT_CENTS`, and sub-cent precision such as 10.995.
pub fn cents_from_amount(amount: f64) -> Result<Cents, AmountError> {
    if !amount.is_finite() {
        return Err(AmountError::NotFinite);
    }
    if amount <= 0.0 {
        return Err(AmountError::NotPositive);
    }

    let scaled = (amount * 100.0).round();
    if scaled > MAX_AMOUNT_CENTS as f64 {
        return Err(AmountError::TooLarge);
    }
    if scaled < 1.0 {
        return Err(AmountError::SubCentPrecision);
    }

    let cents = scaled as Cents;
    // Exact round-trip check: a whole-cent amount divides back to the same f64.
    if cents as f64 / 100.0 != amount {
        return Err(AmountError::SubCentPrecision);
    }
    Ok(cents)
}

/// Convert cents back into the decimal amount used on the API surface.
/// Exact for every value `cents_from_amount` can produce.
pub fn cents_to_amount(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    NotFinite,
    NotPositive,
    TooLarge,
    SubCentPrecision,
}

impl fmt::Display for AmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::NotFinite => write!(f, "amount must be a finite number"),
            AmountError::NotPositive => write!(f, "amount must be positive"),
            AmountError::TooLarge => write!(f, "amount exceeds the maximum allowed"),
            AmountError::SubCentPrecision => {
                write!(f, "amount must be a whole number of cents")
            }
        }
    }
}

impl std::error::Error for AmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5000), "-50.00");
        assert_eq!(format_cents(-1), "-0.01");
    }

    #[test]
    fn test_cents_from_amount() {
        assert_eq!(cents_from_amount(50.0), Ok(5000));
        assert_eq!(cents_from_amount(12.34), Ok(1234));
        assert_eq!(cents_from_amount(12.5), Ok(1250));
        assert_eq!(cents_from_amount(0.01), Ok(1));
        assert_eq!(cents_from_amount(100.0), Ok(10000));
    }

    #[test]
    fn test_cents_from_amount_rejects_non_finite() {
        assert_eq!(cents_from_amount(f64::NAN), Err(AmountError::NotFinite));
        assert_eq!(
            cents_from_amount(f64::INFINITY),
            Err(AmountError::NotFinite)
        );
        assert_eq!(
            cents_from_amount(f64::NEG_INFINITY),
            Err(AmountError::NotFinite)
        );
    }

    #[test]
    fn test_cents_from_amount_rejects_non_positive() {
        assert_eq!(cents_from_amount(0.0), Err(AmountError::NotPositive));
        assert_eq!(cents_from_amount(-50.0), Err(AmountError::NotPositive));
        assert_eq!(cents_from_amount(-0.01), Err(AmountError::NotPositive));
    }

    #[test]
    fn test_cents_from_amount_rejects_sub_cent() {
        assert_eq!(
            cents_from_amount(10.995),
            Err(AmountError::SubCentPrecision)
        );
        assert_eq!(
            cents_from_amount(0.001),
            Err(AmountError::SubCentPrecision)
        );
    }

    #[test]
    fn test_cents_from_amount_rejects_too_large() {
        assert_eq!(cents_from_amount(1.0e18), Err(AmountError::TooLarge));
    }

    #[test]
    fn test_cents_round_trip() {
        for cents in [1, 99, 100, 5000, 123_456_789] {
            assert_eq!(cents_from_amount(cents_to_amount(cents)), Ok(cents));
        }
    }
}
