//! Rounding policy for every monetary value the engine produces.
//!
//! Money is quantized to 2 decimal places with round-half-up (away from
//! zero). Daily rates are kept at 4 decimal places until they are multiplied
//! out into money.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on money.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept on intermediate daily rates.
pub const RATE_DP: u32 = 4;

/// Quantizes a money amount to exactly 2 decimal places, half-up.
///
/// The result always carries scale 2 so equal amounts serialize identically.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_money(Decimal::from_str("1906.665").unwrap()).to_string(), "1906.67");
/// assert_eq!(round_money(Decimal::from_str("-0.005").unwrap()).to_string(), "-0.01");
/// assert_eq!(round_money(Decimal::from(6000)).to_string(), "6000.00");
/// ```
pub fn round_money(value: Decimal) -> Decimal {
    quantize(value, MONEY_DP)
}

/// Quantizes a daily rate to exactly 4 decimal places, half-up.
pub fn round_rate(value: Decimal) -> Decimal {
    quantize(value, RATE_DP)
}

/// Divides a monthly amount into a daily rate at [`RATE_DP`] places.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::daily_rate;
/// use rust_decimal::Decimal;
///
/// assert_eq!(daily_rate(Decimal::from(5200), 26).to_string(), "200.0000");
/// assert_eq!(daily_rate(Decimal::from(6000), 26).to_string(), "230.7692");
/// ```
pub fn daily_rate(monthly: Decimal, divisor: u32) -> Decimal {
    round_rate(monthly / Decimal::from(divisor))
}

/// Formats a rate as a percentage, e.g. `0.15` as `"15%"`.
pub fn percent(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

fn quantize(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec("0.125")), dec("0.13"));
        assert_eq!(round_money(dec("0.124")), dec("0.12"));
        assert_eq!(round_money(dec("2.675")), dec("2.68"));
    }

    #[test]
    fn test_round_money_negative_rounds_away_from_zero() {
        assert_eq!(round_money(dec("-2.675")), dec("-2.68"));
    }

    #[test]
    fn test_round_money_fixes_scale() {
        assert_eq!(round_money(dec("7200")).to_string(), "7200.00");
        assert_eq!(round_money(dec("7200.1")).to_string(), "7200.10");
    }

    #[test]
    fn test_repeating_daily_rate_is_deterministic() {
        // 5200 / 30 = 173.333...
        let first = round_money(dec("5200") / Decimal::from(30) * Decimal::from(11));
        for _ in 0..100 {
            let again = round_money(dec("5200") / Decimal::from(30) * Decimal::from(11));
            assert_eq!(again.to_string(), first.to_string());
        }
        assert_eq!(first, dec("1906.67"));
    }

    #[test]
    fn test_daily_rate_keeps_four_places() {
        assert_eq!(daily_rate(dec("5200"), 30).to_string(), "173.3333");
        assert_eq!(daily_rate(dec("4506"), 26).to_string(), "173.3077");
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(dec("0.15")), "15%");
        assert_eq!(percent(dec("0.10")), "10%");
        assert_eq!(percent(dec("0.125")), "12.5%");
    }
}
