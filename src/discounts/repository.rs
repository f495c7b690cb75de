use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::discounts::error::DiscountError;
use crate::discounts::models::{CreateDiscountRequest, Discount};

const DISCOUNT_COLUMNS: &str = "id, cafeteria_id, name, discount_type, scope, value, \
     category_id, menu_item_id, start_date, end_date, is_active, \
     usage_limit, usage_count, created_at, updated_at";

/// Repository for discount persistence.
#[derive(Clone)]
pub struct DiscountsRepository {
    pool: PgPool,
}

impl DiscountsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Discounts of a cafeteria that are redeemable right now: active flag
    /// set, current time within the window, and usage limit not exhausted.
    pub async fn find_active(&self, cafeteria_id: i32) -> Result<Vec<Discount>, DiscountError> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            r#"
            SELECT {DISCOUNT_COLUMNS}
            FROM discounts
            WHERE cafeteria_id = $1
              AND is_active = TRUE
              AND start_date <= $2
              AND end_date >= $2
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            ORDER BY created_at
            "#
        ))
        .bind(cafeteria_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Discount>, DiscountError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(discount)
    }

    pub async fn find_by_cafeteria(
        &self,
        cafeteria_id: i32,
    ) -> Result<Vec<Discount>, DiscountError> {
        let discounts = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE cafeteria_id = $1 ORDER BY created_at DESC"
        ))
        .bind(cafeteria_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    pub async fn create(&self, request: &CreateDiscountRequest) -> Result<Discount, DiscountError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            r#"
            INSERT INTO discounts
                (cafeteria_id, name, discount_type, scope, value,
                 category_id, menu_item_id, start_date, end_date, usage_limit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(request.cafeteria_id)
        .bind(&request.name)
        .bind(request.discount_type)
        .bind(request.scope)
        .bind(request.value)
        .bind(request.category_id)
        .bind(request.menu_item_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.usage_limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(discount)
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<Discount, DiscountError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            r#"
            UPDATE discounts
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DiscountError::NotFound)?;

        Ok(discount)
    }

    /// Atomically consume one redemption of a discount.
    ///
    /// The conditional `WHERE usage_count < usage_limit` is the guard
    /// against overselling a limited discount under concurrent orders:
    /// whichever transaction commits first wins, the loser sees zero rows
    /// affected and falls back to the undiscounted price.
    ///
    /// Takes any executor so it can run inside the order placement
    /// transaction.
    pub async fn try_consume<'e, E>(executor: E, discount_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE discounts
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1
              AND is_active = TRUE
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(discount_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Validate the scope/reference pairing and the value range of a discount
/// payload. Kept out of the DTO so the rules read in one place.
pub fn validate_discount_request(request: &CreateDiscountRequest) -> Result<(), DiscountError> {
    use crate::discounts::models::{DiscountScope, DiscountType};

    match request.scope {
        DiscountScope::Global => {
            if request.category_id.is_some() || request.menu_item_id.is_some() {
                return Err(DiscountError::InvalidScope(
                    "Global discounts must not reference a category or menu item".to_string(),
                ));
            }
        }
        DiscountScope::Category => {
            if request.category_id.is_none() || request.menu_item_id.is_some() {
                return Err(DiscountError::InvalidScope(
                    "Category discounts require category_id and no menu_item_id".to_string(),
                ));
            }
        }
        DiscountScope::Item => {
            if request.menu_item_id.is_none() || request.category_id.is_some() {
                return Err(DiscountError::InvalidScope(
                    "Item discounts require menu_item_id and no category_id".to_string(),
                ));
            }
        }
    }

    if request.value <= Decimal::ZERO {
        return Err(DiscountError::ValidationError(
            "Discount value must be positive".to_string(),
        ));
    }
    if request.discount_type == DiscountType::Percentage && request.value > Decimal::from(100) {
        return Err(DiscountError::ValidationError(
            "Percentage discounts cannot exceed 100".to_string(),
        ));
    }
    if request.end_date <= request.start_date {
        return Err(DiscountError::ValidationError(
            "end_date must be after start_date".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discounts::models::{DiscountScope, DiscountType};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn base_request() -> CreateDiscountRequest {
        CreateDiscountRequest {
            cafeteria_id: 1,
            name: "Lunch rush".to_string(),
            discount_type: DiscountType::Percentage,
            scope: DiscountScope::Global,
            value: dec!(10),
            category_id: None,
            menu_item_id: None,
            start_date: Utc::now(),
            end_date: Utc::now() + Duration::days(7),
            usage_limit: None,
        }
    }

    #[test]
    fn test_global_scope_rejects_refs() {
        let mut request = base_request();
        request.menu_item_id = Some(4);
        assert!(matches!(
            validate_discount_request(&request),
            Err(DiscountError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_category_scope_requires_category() {
        let mut request = base_request();
        request.scope = DiscountScope::Category;
        assert!(validate_discount_request(&request).is_err());

        request.category_id = Some(2);
        assert!(validate_discount_request(&request).is_ok());
    }

    #[test]
    fn test_item_scope_requires_item() {
        let mut request = base_request();
        request.scope = DiscountScope::Item;
        assert!(validate_discount_request(&request).is_err());

        request.menu_item_id = Some(9);
        assert!(validate_discount_request(&request).is_ok());
    }

    #[test]
    fn test_percentage_over_100_rejected() {
        let mut request = base_request();
        request.value = dec!(120);
        assert!(validate_discount_request(&request).is_err());

        request.discount_type = DiscountType::Fixed;
        assert!(validate_discount_request(&request).is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut request = base_request();
        request.end_date = request.start_date - Duration::hours(1);
        assert!(validate_discount_request(&request).is_err());
    }
}
