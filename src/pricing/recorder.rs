use sqlx::PgPool;

use crate::pricing::models::{PriceChangeType, PriceHistory};
use rust_decimal::Decimal;

const PRICE_HISTORY_COLUMNS: &str =
    "id, menu_item_id, cafeteria_id, old_price, new_price, change_type, changed_by, reason, created_at";

/// Append-only store for price change audit rows. There is deliberately
/// no update or delete path.
#[derive(Clone)]
pub struct PriceHistoryRepository {
    pool: PgPool,
}

/// Parameters for one history row.
pub struct PriceChangeRecord<'a> {
    pub menu_item_id: i32,
    pub cafeteria_id: i32,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub change_type: PriceChangeType,
    pub changed_by: i32,
    pub reason: Option<&'a str>,
}

impl PriceHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a history row. Takes an executor so callers can record
    /// inside the same transaction as the price mutation itself.
    pub async fn record<'e, E>(
        executor: E,
        change: PriceChangeRecord<'_>,
    ) -> Result<PriceHistory, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO price_history
                (menu_item_id, cafeteria_id, old_price, new_price, change_type, changed_by, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PRICE_HISTORY_COLUMNS
        );

        sqlx::query_as::<_, PriceHistory>(&sql)
            .bind(change.menu_item_id)
            .bind(change.cafeteria_id)
            .bind(change.old_price)
            .bind(change.new_price)
            .bind(change.change_type)
            .bind(change.changed_by)
            .bind(change.reason)
            .fetch_one(executor)
            .await
    }

    /// Full change history for one menu item, most recent first.
    pub async fn find_by_menu_item(
        &self,
        menu_item_id: i32,
    ) -> Result<Vec<PriceHistory>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM price_history WHERE menu_item_id = $1 ORDER BY created_at DESC, id DESC",
            PRICE_HISTORY_COLUMNS
        );

        sqlx::query_as::<_, PriceHistory>(&sql)
            .bind(menu_item_id)
            .fetch_all(&self.pool)
            .await
    }
}
