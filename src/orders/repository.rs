use sqlx::PgPool;
use uuid::Uuid;

use crate::discounts::{DiscountsRepository, ResolvedLine};
use crate::models::MenuItem;
use crate::orders::error::OrderError;
use crate::orders::price_calculator::PriceCalculator;
use crate::orders::{Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str = "id, user_id, cafeteria_id, status, payment_status, payment_method, \
     total, checkout_request_id, mpesa_receipt_number, created_at, updated_at";

/// Repository for menu item lookups needed during order placement.
#[derive(Clone)]
pub struct MenuItemsRepository {
    pool: PgPool,
}

impl MenuItemsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<MenuItem>, OrderError> {
        let items =
            sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(items)
    }
}

/// Repository for order persistence.
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Place an order atomically.
    ///
    /// One transaction covers discount usage consumption, stock
    /// decrements, and the order/item inserts, so a failure at any step
    /// leaves no partial order and no decremented stock.
    ///
    /// Discount consumption runs first: each distinct applied discount is
    /// claimed with an atomic conditional increment. A discount that lost
    /// the race is stripped from its lines (they revert to the snapshot
    /// price) rather than failing the order. Stock decrements are also
    /// conditional; losing that race aborts the whole transaction.
    pub async fn place_order(
        &self,
        user_id: i32,
        cafeteria_id: i32,
        payment_method: &str,
        mut lines: Vec<ResolvedLine>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        // Claim one redemption per distinct discount applied to this order.
        let mut discount_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.discount_id).collect();
        discount_ids.sort();
        discount_ids.dedup();

        for discount_id in discount_ids {
            let consumed = DiscountsRepository::try_consume(&mut *tx, discount_id).await?;
            if !consumed {
                tracing::debug!(
                    "Discount {} exhausted at commit time, reverting affected lines",
                    discount_id
                );
                for line in lines.iter_mut().filter(|l| l.discount_id == Some(discount_id)) {
                    line.strip_discount();
                }
            }
        }

        let subtotals: Vec<_> = lines.iter().map(|line| line.subtotal()).collect();
        let total = PriceCalculator::order_total(&subtotals);

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (user_id, cafeteria_id, status, payment_status, payment_method, total)
            VALUES ($1, $2, 'pending', 'pending', $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(cafeteria_id)
        .bind(payment_method)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            // Conditional decrement: zero rows affected means another order
            // took the remaining stock between validation and commit.
            let result = sqlx::query(
                "UPDATE menu_items SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.menu_item_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(OrderError::ConcurrencyConflict(line.menu_item_id));
            }

            sqlx::query(
                r#"
                INSERT INTO order_items
                    (order_id, menu_item_id, quantity, unit_price,
                     discounted_unit_price, discount_id, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id)
            .bind(line.menu_item_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.discounted_unit_price)
            .bind(line.discount_id)
            .bind(line.subtotal())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(order)
    }

    pub async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn find_by_user_id(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = match status {
            Some(status_filter) => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC"
                ))
                .bind(user_id)
                .bind(status_filter)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE user_id = $1 ORDER BY created_at DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    /// Conditionally advance an order's status. The prior status is part
    /// of the WHERE clause, so of two racing writers only one can win;
    /// the loser sees zero rows and gets a conflict.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(new_status)
        .bind(order_id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(OrderError::StatusConflict)?;

        Ok(order)
    }
}

/// Repository for order line item reads.
#[derive(Clone)]
pub struct OrderItemsRepository {
    pool: PgPool,
}

impl OrderItemsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_order_id(&self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, menu_item_id, quantity, unit_price,
                   discounted_unit_price, discount_id, subtotal
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
