//! Monetary types for balance and rate representation.

use rust_decimal::Decimal;

/// Native-unit balance represented as a Decimal for precision.
pub type Amount = Decimal;

/// Exchange rate (quote units per one native unit).
pub type Rate = Decimal;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn amount_and_rate_are_decimal() {
        let amount: Amount = dec!(0.25);
        let rate: Rate = dec!(3200);

        assert_eq!(amount * rate, dec!(800));
    }
}
