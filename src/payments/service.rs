// Payment / Transaction Reconciler
//
// Tracks a mobile-money checkout through pending/completed/failed and
// matches asynchronous provider callbacks back to the originating order.

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::orders::{OrdersRepository, PaymentStatus};
use crate::payments::error::PaymentError;
use crate::payments::gateway::{PaymentGateway, StkPushRequest};
use crate::payments::models::{
    CallbackOutcome, CheckoutResponse, StkCallback, Transaction, TransactionStatus,
};
use crate::payments::repository::TransactionsRepository;

/// Service for checkout initiation and callback reconciliation.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    orders_repo: OrdersRepository,
    transactions_repo: TransactionsRepository,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        orders_repo: OrdersRepository,
        transactions_repo: TransactionsRepository,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            pool,
            orders_repo,
            transactions_repo,
            gateway,
        }
    }

    /// Initiate an STK push for an order.
    ///
    /// Only orders with payment_status = pending are eligible. The
    /// transaction is created before the gateway call with the order's
    /// current total; if the gateway fails it stays pending (without a
    /// checkout request id) for manual reconciliation, and the failure is
    /// surfaced to the caller. No automatic retry happens here.
    pub async fn initiate_checkout(
        &self,
        order_id: Uuid,
        phone_number: &str,
    ) -> Result<CheckoutResponse, PaymentError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?
            .ok_or(PaymentError::OrderNotFound)?;

        if order.payment_status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidOrderState(format!(
                "Order {} has payment status {}, checkout requires pending",
                order_id, order.payment_status
            )));
        }

        let transaction = self
            .transactions_repo
            .create(order_id, phone_number, order.total)
            .await?;

        let push = self
            .gateway
            .stk_push(&StkPushRequest {
                phone_number: phone_number.to_string(),
                amount: order.total,
                account_reference: order_id.to_string(),
                description: "Campus Eats order".to_string(),
            })
            .await?;

        self.transactions_repo
            .attach_checkout_request(transaction.id, order_id, &push.checkout_request_id)
            .await?;

        tracing::info!(
            "Issued checkout request {} for order {} (amount {})",
            push.checkout_request_id,
            order_id,
            order.total
        );

        Ok(CheckoutResponse {
            order_id,
            transaction_id: transaction.id,
            checkout_request_id: push.checkout_request_id,
            customer_message: push.customer_message,
        })
    }

    /// Reconcile a provider callback with its transaction and order.
    ///
    /// Idempotent under at-least-once delivery: the transaction row is
    /// locked, and a transaction already in a terminal state accepts any
    /// further callback as a no-op. Otherwise the transaction and the
    /// order move together in one database transaction.
    pub async fn handle_callback(&self, callback: &StkCallback) -> Result<(), PaymentError> {
        let mut db_tx = self.pool.begin().await?;

        let transaction = TransactionsRepository::lock_by_checkout_request(
            &mut db_tx,
            &callback.checkout_request_id,
        )
        .await?
        .ok_or_else(|| {
            PaymentError::TransactionNotFound(callback.checkout_request_id.clone())
        })?;

        if transaction.status.is_terminal() {
            tracing::debug!(
                "Duplicate callback for checkout request {} (transaction already {}), ignoring",
                callback.checkout_request_id,
                transaction.status
            );
            db_tx.commit().await?;
            return Ok(());
        }

        match callback.outcome() {
            CallbackOutcome::Success { receipt_number } => {
                TransactionsRepository::finalize(
                    &mut db_tx,
                    transaction.id,
                    TransactionStatus::Completed,
                    receipt_number.as_deref(),
                    None,
                )
                .await?;

                sqlx::query(
                    "UPDATE orders SET payment_status = 'paid', \
                     mpesa_receipt_number = $1, updated_at = NOW() WHERE id = $2",
                )
                .bind(receipt_number.as_deref())
                .bind(transaction.order_id)
                .execute(&mut *db_tx)
                .await?;

                tracing::info!(
                    "Payment completed for order {} (receipt {:?})",
                    transaction.order_id,
                    receipt_number
                );
            }
            CallbackOutcome::Failure { code, description } => {
                TransactionsRepository::finalize(
                    &mut db_tx,
                    transaction.id,
                    TransactionStatus::Failed,
                    None,
                    Some(&description),
                )
                .await?;

                sqlx::query(
                    "UPDATE orders SET payment_status = 'failed', updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(transaction.order_id)
                .execute(&mut *db_tx)
                .await?;

                tracing::warn!(
                    "Payment failed for order {}: {} ({})",
                    transaction.order_id,
                    description,
                    code
                );
            }
        }

        db_tx.commit().await?;
        Ok(())
    }

    pub async fn order_transactions(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<Transaction>, PaymentError> {
        self.transactions_repo.find_by_order_id(order_id).await
    }
}
