use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents using round-half-up and pin the scale to two places,
/// so `100` renders as `100.00`.
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `amount * percentage / 100`, unrounded.
pub fn percentage_of(amount: Decimal, percentage: Decimal) -> Decimal {
    amount * percentage / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(round_currency(dec!(10.005)), dec!(10.01));
        assert_eq!(round_currency(dec!(10.004)), dec!(10.00));
        assert_eq!(round_currency(dec!(2.675)), dec!(2.68));
        assert_eq!(round_currency(dec!(100)).to_string(), "100.00");
    }

    #[test]
    fn test_percentage_of() {
        assert_eq!(percentage_of(dec!(150), dec!(10)), dec!(15));
        assert_eq!(percentage_of(dec!(99.99), dec!(0)), dec!(0));
    }
}
