use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` is a percentage off the unit price (0 < value <= 100).
    Percentage,
    /// `value` is a flat amount subtracted from the unit price.
    Fixed,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Fixed => write!(f, "fixed"),
        }
    }
}

/// The granularity at which a discount applies.
/// Precedence when several qualify for one line: item > category > global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountScope {
    /// Every item of the cafeteria.
    Global,
    /// Items of one category.
    Category,
    /// One specific menu item.
    Item,
}

impl std::fmt::Display for DiscountScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountScope::Global => write!(f, "global"),
            DiscountScope::Category => write!(f, "category"),
            DiscountScope::Item => write!(f, "item"),
        }
    }
}

/// A pricing rule scoped to a cafeteria.
///
/// Active only when `is_active` and now falls within
/// `[start_date, end_date]`. When `usage_limit` is set, redemption stops
/// once `usage_count` reaches it; the increment is an atomic conditional
/// update so two concurrent orders cannot oversell the limit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Discount {
    pub id: Uuid,
    pub cafeteria_id: i32,
    pub name: String,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub value: Decimal,
    pub category_id: Option<i32>,
    pub menu_item_id: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a discount.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiscountRequest {
    pub cafeteria_id: i32,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub value: Decimal,
    pub category_id: Option<i32>,
    pub menu_item_id: Option<i32>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
}

/// One cart line as seen by the resolver.
#[derive(Debug, Clone)]
pub struct DiscountLine {
    pub menu_item_id: i32,
    pub category_id: Option<i32>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Resolver output for one line: the snapshot price, the price after the
/// winning discount (equal to `unit_price` when none applied), and the
/// discount id for traceability.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub menu_item_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discounted_unit_price: Decimal,
    pub discount_id: Option<Uuid>,
}

impl ResolvedLine {
    /// Line subtotal using the discounted price.
    pub fn subtotal(&self) -> Decimal {
        self.discounted_unit_price * Decimal::from(self.quantity)
    }

    /// Drop the discount, reverting to the snapshot price. Used when the
    /// usage-limit increment loses the race at commit time.
    pub fn strip_discount(&mut self) {
        self.discounted_unit_price = self.unit_price;
        self.discount_id = None;
    }
}
