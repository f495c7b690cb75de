use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// State of one mobile-money payment attempt.
/// Exactly one terminal state (completed or failed) is reachable from
/// pending; after that the transaction never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One mobile-money payment attempt for an order.
/// `amount` equals the order total at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub checkout_request_id: Option<String>,
    pub phone_number: String,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub mpesa_receipt_number: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for initiating checkout on an order.
#[derive(Debug, Deserialize, Validate)]
pub struct InitiateCheckoutRequest {
    #[validate(custom = "crate::validation::validate_mpesa_phone")]
    pub phone_number: String,
}

/// Response DTO after an STK push has been issued.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub transaction_id: Uuid,
    pub checkout_request_id: String,
    pub customer_message: String,
}

/// The envelope Daraja posts to the callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// The callback payload matched back to a transaction by
/// `checkout_request_id`. ResultCode 0 means the customer paid.
#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item")]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

/// Provider outcome after flattening the callback metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success { receipt_number: Option<String> },
    Failure { code: i64, description: String },
}

impl StkCallback {
    pub fn outcome(&self) -> CallbackOutcome {
        if self.result_code == 0 {
            CallbackOutcome::Success {
                receipt_number: self.receipt_number(),
            }
        } else {
            CallbackOutcome::Failure {
                code: self.result_code,
                description: self.result_desc.clone(),
            }
        }
    }

    /// The M-Pesa receipt number from the callback metadata, when present.
    pub fn receipt_number(&self) -> Option<String> {
        self.callback_metadata.as_ref()?.items.iter().find_map(|item| {
            if item.name == "MpesaReceiptNumber" {
                item.value.as_ref()?.as_str().map(str::to_string)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn success_payload() -> serde_json::Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            {"Name": "Amount", "Value": 160.00},
                            {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                            {"Name": "TransactionDate", "Value": 20191219102115u64},
                            {"Name": "PhoneNumber", "Value": 254712345678u64}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_success_callback() {
        let envelope: StkCallbackEnvelope =
            serde_json::from_value(success_payload()).unwrap();
        let callback = envelope.body.stk_callback;

        assert_eq!(callback.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(
            callback.outcome(),
            CallbackOutcome::Success {
                receipt_number: Some("NLJ7RT61SV".to_string())
            }
        );
    }

    #[test]
    fn test_parse_failure_callback() {
        let payload = json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": "ws_CO_191220191020363925",
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user."
                }
            }
        });

        let envelope: StkCallbackEnvelope = serde_json::from_value(payload).unwrap();
        let callback = envelope.body.stk_callback;

        assert_eq!(
            callback.outcome(),
            CallbackOutcome::Failure {
                code: 1032,
                description: "Request cancelled by user.".to_string()
            }
        );
        assert!(callback.receipt_number().is_none());
    }
}
