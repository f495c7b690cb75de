// Discount Resolver
//
// Given a cafeteria and the lines of a cart, determines the discount
// applied to each line. At most one discount applies per line, the most
// specific scope wins, and a line with no qualifying discount keeps its
// snapshot price.

use rust_decimal::Decimal;

use crate::discounts::error::DiscountError;
use crate::discounts::models::{
    Discount, DiscountLine, DiscountScope, DiscountType, ResolvedLine,
};
use crate::discounts::repository::DiscountsRepository;

/// Resolves per-line discounts against the active discounts of a cafeteria.
#[derive(Clone)]
pub struct DiscountResolver {
    repo: DiscountsRepository,
}

impl DiscountResolver {
    pub fn new(repo: DiscountsRepository) -> Self {
        Self { repo }
    }

    /// Resolve discounts for every line of a cart.
    ///
    /// Fetches the currently redeemable discounts once, then applies the
    /// precedence rules per line. Usage limits are enforced later, at
    /// commit time, via the atomic conditional increment; resolution only
    /// filters out discounts already known to be exhausted.
    pub async fn resolve(
        &self,
        cafeteria_id: i32,
        lines: &[DiscountLine],
    ) -> Result<Vec<ResolvedLine>, DiscountError> {
        let active = self.repo.find_active(cafeteria_id).await?;

        Ok(lines
            .iter()
            .map(|line| resolve_line(line, &active))
            .collect())
    }
}

/// Apply the winning discount (if any) to a single line.
pub fn resolve_line(line: &DiscountLine, discounts: &[Discount]) -> ResolvedLine {
    match select_for_line(line, discounts) {
        Some(discount) => ResolvedLine {
            menu_item_id: line.menu_item_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discounted_unit_price: discounted_unit_price(line.unit_price, discount),
            discount_id: Some(discount.id),
        },
        None => ResolvedLine {
            menu_item_id: line.menu_item_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discounted_unit_price: line.unit_price,
            discount_id: None,
        },
    }
}

/// Pick the discount that applies to a line.
///
/// Candidates: scope=global, scope=category matching the line's category,
/// scope=item matching the line's menu item. The most specific scope wins
/// (item > category > global); among candidates of the winning scope the
/// one with the largest per-unit saving is chosen.
pub fn select_for_line<'a>(line: &DiscountLine, discounts: &'a [Discount]) -> Option<&'a Discount> {
    let candidates = discounts.iter().filter(|d| matches_line(d, line));

    candidates.max_by(|a, b| {
        scope_rank(a.scope)
            .cmp(&scope_rank(b.scope))
            .then_with(|| unit_saving(line.unit_price, a).cmp(&unit_saving(line.unit_price, b)))
    })
}

fn matches_line(discount: &Discount, line: &DiscountLine) -> bool {
    match discount.scope {
        DiscountScope::Global => true,
        DiscountScope::Category => {
            discount.category_id.is_some() && discount.category_id == line.category_id
        }
        DiscountScope::Item => discount.menu_item_id == Some(line.menu_item_id),
    }
}

fn scope_rank(scope: DiscountScope) -> u8 {
    match scope {
        DiscountScope::Global => 0,
        DiscountScope::Category => 1,
        DiscountScope::Item => 2,
    }
}

/// The per-unit price after applying a discount, floored at zero and
/// rounded to two decimal places.
pub fn discounted_unit_price(unit_price: Decimal, discount: &Discount) -> Decimal {
    let discounted = match discount.discount_type {
        DiscountType::Percentage => {
            unit_price * (Decimal::ONE - discount.value / Decimal::from(100))
        }
        DiscountType::Fixed => unit_price - discount.value,
    };

    discounted.max(Decimal::ZERO).round_dp(2)
}

fn unit_saving(unit_price: Decimal, discount: &Discount) -> Decimal {
    unit_price - discounted_unit_price(unit_price, discount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn discount(
        scope: DiscountScope,
        discount_type: DiscountType,
        value: Decimal,
        category_id: Option<i32>,
        menu_item_id: Option<i32>,
    ) -> Discount {
        Discount {
            id: Uuid::new_v4(),
            cafeteria_id: 1,
            name: "test".to_string(),
            discount_type,
            scope,
            value,
            category_id,
            menu_item_id,
            start_date: Utc::now() - Duration::hours(1),
            end_date: Utc::now() + Duration::hours(1),
            is_active: true,
            usage_limit: None,
            usage_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(menu_item_id: i32, category_id: Option<i32>, unit_price: Decimal) -> DiscountLine {
        DiscountLine {
            menu_item_id,
            category_id,
            unit_price,
            quantity: 1,
        }
    }

    #[test]
    fn test_item_scope_twenty_percent() {
        // MenuItem price=100, item-scoped 20% discount: discounted unit 80.
        let d = discount(
            DiscountScope::Item,
            DiscountType::Percentage,
            dec!(20),
            None,
            Some(7),
        );
        let resolved = resolve_line(&line(7, None, dec!(100)), &[d.clone()]);

        assert_eq!(resolved.discounted_unit_price, dec!(80.00));
        assert_eq!(resolved.discount_id, Some(d.id));
    }

    #[test]
    fn test_no_discount_keeps_price() {
        let resolved = resolve_line(&line(7, None, dec!(100)), &[]);
        assert_eq!(resolved.discounted_unit_price, dec!(100));
        assert!(resolved.discount_id.is_none());
    }

    #[test]
    fn test_item_beats_category_beats_global() {
        let global = discount(
            DiscountScope::Global,
            DiscountType::Percentage,
            dec!(50),
            None,
            None,
        );
        let category = discount(
            DiscountScope::Category,
            DiscountType::Percentage,
            dec!(40),
            Some(3),
            None,
        );
        let item = discount(
            DiscountScope::Item,
            DiscountType::Percentage,
            dec!(5),
            None,
            Some(7),
        );

        // Item scope wins even though its saving is the smallest.
        let all = vec![global.clone(), category.clone(), item.clone()];
        let selected = select_for_line(&line(7, Some(3), dec!(100)), &all).unwrap();
        assert_eq!(selected.id, item.id);

        // Without an item match, category beats global.
        let no_item = vec![global.clone(), category.clone()];
        let selected = select_for_line(&line(8, Some(3), dec!(100)), &no_item).unwrap();
        assert_eq!(selected.id, category.id);

        // Category mismatch falls through to global.
        let selected = select_for_line(&line(8, Some(9), dec!(100)), &no_item).unwrap();
        assert_eq!(selected.id, global.id);
    }

    #[test]
    fn test_best_saving_within_same_scope() {
        let small = discount(
            DiscountScope::Global,
            DiscountType::Fixed,
            dec!(10),
            None,
            None,
        );
        let big = discount(
            DiscountScope::Global,
            DiscountType::Percentage,
            dec!(25),
            None,
            None,
        );

        let candidates = [small, big.clone()];
        let selected = select_for_line(&line(1, None, dec!(100)), &candidates).unwrap();
        assert_eq!(selected.id, big.id);
    }

    #[test]
    fn test_fixed_discount_floors_at_zero() {
        let d = discount(
            DiscountScope::Global,
            DiscountType::Fixed,
            dec!(80),
            None,
            None,
        );
        assert_eq!(discounted_unit_price(dec!(50), &d), Decimal::ZERO);
        assert_eq!(discounted_unit_price(dec!(100), &d), dec!(20));
    }

    #[test]
    fn test_category_discount_needs_line_category() {
        let d = discount(
            DiscountScope::Category,
            DiscountType::Percentage,
            dec!(10),
            Some(3),
            None,
        );
        // A line with no category never matches a category discount.
        assert!(select_for_line(&line(1, None, dec!(100)), &[d]).is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn any_discount() -> impl Strategy<Value = Discount> {
        (
            prop_oneof![Just(DiscountType::Percentage), Just(DiscountType::Fixed)],
            1u32..=10_000,
        )
            .prop_map(|(discount_type, raw_value)| {
                let value = match discount_type {
                    // Percentages stay within (0, 100].
                    DiscountType::Percentage => {
                        Decimal::from(raw_value % 100 + 1)
                    }
                    DiscountType::Fixed => Decimal::from(raw_value) / Decimal::from(100),
                };
                Discount {
                    id: Uuid::new_v4(),
                    cafeteria_id: 1,
                    name: "prop".to_string(),
                    discount_type,
                    scope: DiscountScope::Global,
                    value,
                    category_id: None,
                    menu_item_id: None,
                    start_date: Utc::now() - Duration::hours(1),
                    end_date: Utc::now() + Duration::hours(1),
                    is_active: true,
                    usage_limit: None,
                    usage_count: 0,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }
            })
    }

    proptest! {
        /// Discounted prices never go negative and never exceed the
        /// original unit price.
        #[test]
        fn prop_discounted_price_bounded(
            discount in any_discount(),
            price_cents in 0u32..=1_000_000,
        ) {
            let unit_price = Decimal::from(price_cents) / Decimal::from(100);
            let discounted = discounted_unit_price(unit_price, &discount);

            prop_assert!(discounted >= Decimal::ZERO);
            prop_assert!(discounted <= unit_price);
        }

        /// A 100% discount always yields zero.
        #[test]
        fn prop_full_percentage_zeroes_price(price_cents in 0u32..=1_000_000) {
            let mut discount = Discount {
                id: Uuid::new_v4(),
                cafeteria_id: 1,
                name: "full".to_string(),
                discount_type: DiscountType::Percentage,
                scope: DiscountScope::Global,
                value: Decimal::from(100),
                category_id: None,
                menu_item_id: None,
                start_date: Utc::now() - Duration::hours(1),
                end_date: Utc::now() + Duration::hours(1),
                is_active: true,
                usage_limit: None,
                usage_count: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            discount.value = Decimal::from(100);

            let unit_price = Decimal::from(price_cents) / Decimal::from(100);
            prop_assert_eq!(discounted_unit_price(unit_price, &discount), Decimal::ZERO);
        }
    }
}
