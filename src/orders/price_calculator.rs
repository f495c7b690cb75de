use rust_decimal::Decimal;

/// Computes order totals from resolved line subtotals.
pub struct PriceCalculator;

impl PriceCalculator {
    /// Order total: sum of all line subtotals, floored at zero.
    pub fn order_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum::<Decimal>().max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_total() {
        let subtotals = vec![dec!(160.00), dec!(45.50), dec!(30.00)];
        assert_eq!(PriceCalculator::order_total(&subtotals), dec!(235.50));
    }

    #[test]
    fn test_empty_order_total_is_zero() {
        assert_eq!(PriceCalculator::order_total(&[]), Decimal::ZERO);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// total == Σ(quantity × unit price) and is never negative.
        #[test]
        fn prop_total_matches_sum_of_lines(
            lines in prop::collection::vec((1i32..=50, 0u32..=100_000), 1..=15)
        ) {
            let subtotals: Vec<Decimal> = lines
                .iter()
                .map(|&(qty, price_cents)| {
                    let unit_price = Decimal::from(price_cents) / Decimal::from(100);
                    unit_price * Decimal::from(qty)
                })
                .collect();

            let total = PriceCalculator::order_total(&subtotals);
            let expected: Decimal = subtotals.iter().sum();

            prop_assert_eq!(total, expected);
            prop_assert!(total >= Decimal::ZERO);
        }

        /// Line order does not change the total.
        #[test]
        fn prop_total_is_order_independent(
            subtotal_cents in prop::collection::vec(0u32..=100_000, 2..=10)
        ) {
            let subtotals: Vec<Decimal> = subtotal_cents
                .iter()
                .map(|&cents| Decimal::from(cents) / Decimal::from(100))
                .collect();

            let mut reversed = subtotals.clone();
            reversed.reverse();

            prop_assert_eq!(
                PriceCalculator::order_total(&subtotals),
                PriceCalculator::order_total(&reversed)
            );
        }
    }
}
