use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// An independently managed food outlet on campus.
/// Most other entities (menu items, orders, discounts) are scoped to one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cafeteria {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Main Hall Cafeteria")]
    pub name: String,
    #[schema(example = "Block C, Ground Floor")]
    pub location: String,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu category within a cafeteria (e.g. "Breakfast", "Drinks").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    #[schema(example = 3)]
    pub id: i32,
    pub cafeteria_id: i32,
    #[schema(example = "Breakfast")]
    pub name: String,
}

/// A purchasable item on a cafeteria menu.
///
/// `price` is the current menu price; orders snapshot it into their line
/// items at purchase time, so later edits never touch past orders.
/// `available = false` or `stock = 0` blocks new order lines.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MenuItem {
    #[schema(example = 12)]
    pub id: i32,
    pub cafeteria_id: i32,
    pub category_id: Option<i32>,
    #[schema(example = "Chapati & Beans")]
    pub name: String,
    #[schema(example = "Two chapatis with a bowl of beans")]
    pub description: String,
    pub image_url: String,
    #[schema(value_type = f64, example = 120.00)]
    pub price: Decimal,
    #[schema(example = 40)]
    pub stock: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a new menu item.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItem {
    pub cafeteria_id: i32,
    pub category_id: Option<i32>,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[validate(custom = "crate::validation::validate_price")]
    #[schema(value_type = f64, example = 120.00)]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_available")]
    pub available: bool,
    /// Admin creating the item; recorded on the opening price audit row.
    #[schema(example = 7)]
    pub created_by: i32,
}

fn default_available() -> bool {
    true
}

/// Payload for updating a menu item.
///
/// Price is deliberately absent: price changes go through the pricing
/// endpoints so the audit entry commits together with the mutation.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItem {
    pub category_id: Option<i32>,
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,
    pub available: Option<bool>,
}
