use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::payments::error::PaymentError;
use crate::payments::models::{Transaction, TransactionStatus};

const TRANSACTION_COLUMNS: &str = "id, order_id, checkout_request_id, phone_number, amount, status, \
     mpesa_receipt_number, failure_reason, created_at, updated_at";

/// Repository for payment transaction persistence.
#[derive(Clone)]
pub struct TransactionsRepository {
    pool: PgPool,
}

impl TransactionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending transaction for an order. Amount is fixed to the
    /// order total at this moment.
    pub async fn create(
        &self,
        order_id: Uuid,
        phone_number: &str,
        amount: Decimal,
    ) -> Result<Transaction, PaymentError> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (order_id, phone_number, amount, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(phone_number)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    pub async fn find_by_order_id(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<Transaction>, PaymentError> {
        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE order_id = $1 ORDER BY created_at DESC"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Store the gateway's checkout request id on both the transaction and
    /// its order, atomically.
    pub async fn attach_checkout_request(
        &self,
        transaction_id: Uuid,
        order_id: Uuid,
        checkout_request_id: &str,
    ) -> Result<(), PaymentError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE transactions SET checkout_request_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(checkout_request_id)
        .bind(transaction_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE orders SET checkout_request_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(checkout_request_id)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Look up and row-lock the transaction for a checkout request id.
    ///
    /// The lock serializes concurrent callback deliveries for the same
    /// checkout request; the second delivery blocks until the first
    /// commits, then sees the terminal status and becomes a no-op.
    pub async fn lock_by_checkout_request(
        conn: &mut PgConnection,
        checkout_request_id: &str,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE checkout_request_id = $1 FOR UPDATE"
        ))
        .bind(checkout_request_id)
        .fetch_optional(conn)
        .await
    }

    /// Move a pending transaction to its terminal state.
    pub async fn finalize(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        status: TransactionStatus,
        mpesa_receipt_number: Option<&str>,
        failure_reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1,
                mpesa_receipt_number = $2,
                failure_reason = $3,
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(status)
        .bind(mpesa_receipt_number)
        .bind(failure_reason)
        .bind(transaction_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
