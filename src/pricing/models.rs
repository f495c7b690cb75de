use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// How a price change was made. Bulk operations stamp every affected
/// item's history row with the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceChangeType {
    Individual,
    BulkPercentage,
    BulkFixed,
}

impl std::fmt::Display for PriceChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PriceChangeType::Individual => "individual",
            PriceChangeType::BulkPercentage => "bulk_percentage",
            PriceChangeType::BulkFixed => "bulk_fixed",
        };
        write!(f, "{}", s)
    }
}

/// One immutable audit record of a menu item price change.
/// Rows are only ever appended, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceHistory {
    pub id: i32,
    pub menu_item_id: i32,
    pub cafeteria_id: i32,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub change_type: PriceChangeType,
    pub changed_by: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for an individual price update.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePriceRequest {
    #[validate(custom = "crate::validation::validate_price")]
    pub new_price: Decimal,
    /// Administrator performing the change.
    pub changed_by: i32,
    pub reason: Option<String>,
}

/// The arithmetic of a bulk adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAdjustmentKind {
    /// `value` percent added to each price (negative values reduce).
    Percentage,
    /// `value` added to each price (negative values reduce).
    Fixed,
}

/// Request DTO for a cafeteria-wide bulk price adjustment.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkPriceAdjustmentRequest {
    pub kind: BulkAdjustmentKind,
    pub value: Decimal,
    pub changed_by: i32,
    pub reason: Option<String>,
}

impl BulkAdjustmentKind {
    pub fn change_type(&self) -> PriceChangeType {
        match self {
            BulkAdjustmentKind::Percentage => PriceChangeType::BulkPercentage,
            BulkAdjustmentKind::Fixed => PriceChangeType::BulkFixed,
        }
    }
}

/// Summary returned after a bulk adjustment.
#[derive(Debug, Serialize)]
pub struct BulkAdjustmentResult {
    pub cafeteria_id: i32,
    pub change_type: PriceChangeType,
    /// Number of items whose price actually changed (and therefore the
    /// number of history rows appended).
    pub items_changed: usize,
}

/// The new price after applying a bulk adjustment to one item: floored at
/// zero and rounded to two decimal places.
pub fn apply_adjustment(old_price: Decimal, kind: BulkAdjustmentKind, value: Decimal) -> Decimal {
    let adjusted = match kind {
        BulkAdjustmentKind::Percentage => {
            old_price * (Decimal::ONE + value / Decimal::from(100))
        }
        BulkAdjustmentKind::Fixed => old_price + value,
    };

    adjusted.max(Decimal::ZERO).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percentage_increase() {
        assert_eq!(
            apply_adjustment(dec!(100), BulkAdjustmentKind::Percentage, dec!(10)),
            dec!(110.00)
        );
        assert_eq!(
            apply_adjustment(dec!(45.50), BulkAdjustmentKind::Percentage, dec!(10)),
            dec!(50.05)
        );
    }

    #[test]
    fn test_percentage_decrease() {
        assert_eq!(
            apply_adjustment(dec!(100), BulkAdjustmentKind::Percentage, dec!(-25)),
            dec!(75.00)
        );
    }

    #[test]
    fn test_fixed_adjustment() {
        assert_eq!(
            apply_adjustment(dec!(100), BulkAdjustmentKind::Fixed, dec!(15)),
            dec!(115.00)
        );
        assert_eq!(
            apply_adjustment(dec!(100), BulkAdjustmentKind::Fixed, dec!(-30)),
            dec!(70.00)
        );
    }

    #[test]
    fn test_adjustment_floors_at_zero() {
        assert_eq!(
            apply_adjustment(dec!(20), BulkAdjustmentKind::Fixed, dec!(-50)),
            Decimal::ZERO
        );
        assert_eq!(
            apply_adjustment(dec!(20), BulkAdjustmentKind::Percentage, dec!(-150)),
            Decimal::ZERO
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Adjusted prices are never negative.
        #[test]
        fn prop_adjusted_price_non_negative(
            price_cents in 0u32..=1_000_000,
            value_cents in -100_000i64..=100_000,
            percentage in prop::bool::ANY,
        ) {
            let old_price = Decimal::from(price_cents) / Decimal::from(100);
            let value = Decimal::from(value_cents) / Decimal::from(100);
            let kind = if percentage {
                BulkAdjustmentKind::Percentage
            } else {
                BulkAdjustmentKind::Fixed
            };

            prop_assert!(apply_adjustment(old_price, kind, value) >= Decimal::ZERO);
        }

        /// A zero adjustment leaves the price unchanged.
        #[test]
        fn prop_zero_adjustment_is_identity(price_cents in 0u32..=1_000_000) {
            let old_price = Decimal::from(price_cents) / Decimal::from(100);

            prop_assert_eq!(
                apply_adjustment(old_price, BulkAdjustmentKind::Percentage, Decimal::ZERO),
                old_price.round_dp(2)
            );
            prop_assert_eq!(
                apply_adjustment(old_price, BulkAdjustmentKind::Fixed, Decimal::ZERO),
                old_price.round_dp(2)
            );
        }
    }
}
