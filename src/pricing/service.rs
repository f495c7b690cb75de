use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::models::MenuItem;
use crate::pricing::error::PricingError;
use crate::pricing::models::{
    apply_adjustment, BulkAdjustmentResult, BulkPriceAdjustmentRequest, PriceChangeType,
    PriceHistory, UpdatePriceRequest,
};
use crate::pricing::recorder::{PriceChangeRecord, PriceHistoryRepository};

/// Price mutations and their audit trail. Every price write and its
/// history row commit in the same transaction.
#[derive(Clone)]
pub struct PricingService {
    pool: PgPool,
    history_repo: PriceHistoryRepository,
}

impl PricingService {
    pub fn new(pool: PgPool, history_repo: PriceHistoryRepository) -> Self {
        Self { pool, history_repo }
    }

    /// Sets a single item's price. Setting a price equal to the current
    /// one is a no-op and appends no history row.
    pub async fn update_price(
        &self,
        menu_item_id: i32,
        request: UpdatePriceRequest,
    ) -> Result<MenuItem, PricingError> {
        let new_price = request.new_price.round_dp(2);
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT cafeteria_id, price FROM menu_items WHERE id = $1 FOR UPDATE",
        )
        .bind(menu_item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::MenuItemNotFound(menu_item_id))?;

        let cafeteria_id: i32 = row.get("cafeteria_id");
        let old_price: Decimal = row.get("price");

        if old_price == new_price {
            tx.commit().await?;
            tracing::debug!(
                menu_item_id,
                "Price update is a no-op, price unchanged at {}",
                old_price
            );
            return self.fetch_item(menu_item_id).await;
        }

        sqlx::query("UPDATE menu_items SET price = $1 WHERE id = $2")
            .bind(new_price)
            .bind(menu_item_id)
            .execute(&mut *tx)
            .await?;

        PriceHistoryRepository::record(
            &mut *tx,
            PriceChangeRecord {
                menu_item_id,
                cafeteria_id,
                old_price,
                new_price,
                change_type: PriceChangeType::Individual,
                changed_by: request.changed_by,
                reason: request.reason.as_deref(),
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            menu_item_id,
            "Price updated from {} to {} by user {}",
            old_price,
            new_price,
            request.changed_by
        );

        self.fetch_item(menu_item_id).await
    }

    /// Applies one adjustment to every menu item in a cafeteria, appending
    /// one history row per item whose price actually changed. Items the
    /// adjustment leaves unchanged get no history row.
    pub async fn bulk_adjust(
        &self,
        cafeteria_id: i32,
        request: BulkPriceAdjustmentRequest,
    ) -> Result<BulkAdjustmentResult, PricingError> {
        if request.value == Decimal::ZERO {
            return Err(PricingError::ValidationError(
                "Adjustment value must be non-zero".to_string(),
            ));
        }

        let change_type = request.kind.change_type();
        let mut tx = self.pool.begin().await?;

        // Lock the cafeteria's items in a stable order so concurrent bulk
        // adjustments cannot deadlock against each other.
        let rows = sqlx::query(
            "SELECT id, price FROM menu_items WHERE cafeteria_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(cafeteria_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut items_changed = 0usize;

        for row in rows {
            let menu_item_id: i32 = row.get("id");
            let old_price: Decimal = row.get("price");
            let new_price = apply_adjustment(old_price, request.kind, request.value);

            if new_price == old_price {
                continue;
            }

            sqlx::query("UPDATE menu_items SET price = $1 WHERE id = $2")
                .bind(new_price)
                .bind(menu_item_id)
                .execute(&mut *tx)
                .await?;

            PriceHistoryRepository::record(
                &mut *tx,
                PriceChangeRecord {
                    menu_item_id,
                    cafeteria_id,
                    old_price,
                    new_price,
                    change_type,
                    changed_by: request.changed_by,
                    reason: request.reason.as_deref(),
                },
            )
            .await?;

            items_changed += 1;
        }

        tx.commit().await?;

        tracing::info!(
            cafeteria_id,
            items_changed,
            "Bulk {} price adjustment of {} applied by user {}",
            change_type,
            request.value,
            request.changed_by
        );

        Ok(BulkAdjustmentResult {
            cafeteria_id,
            change_type,
            items_changed,
        })
    }

    pub async fn price_history(
        &self,
        menu_item_id: i32,
    ) -> Result<Vec<PriceHistory>, PricingError> {
        if !self.menu_item_exists(menu_item_id).await? {
            return Err(PricingError::MenuItemNotFound(menu_item_id));
        }

        Ok(self.history_repo.find_by_menu_item(menu_item_id).await?)
    }

    async fn fetch_item(&self, menu_item_id: i32) -> Result<MenuItem, PricingError> {
        sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = $1")
            .bind(menu_item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PricingError::MenuItemNotFound(menu_item_id))
    }

    async fn menu_item_exists(&self, menu_item_id: i32) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 AS one FROM menu_items WHERE id = $1")
            .bind(menu_item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
