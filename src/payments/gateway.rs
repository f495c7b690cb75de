// M-Pesa (Daraja) gateway client.
//
// The reconciler only depends on the `PaymentGateway` trait; the Daraja
// HTTP implementation lives here and tests substitute a mock.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

/// Errors from the external mobile-money gateway. The initiating
/// transaction stays pending when any of these occur.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway authentication failed: {0}")]
    Auth(String),

    #[error("Gateway rejected the request: {code} {description}")]
    Rejected { code: String, description: String },

    #[error("Amount {0} cannot be represented as whole shillings")]
    InvalidAmount(Decimal),
}

/// Outbound STK push request.
#[derive(Debug, Clone)]
pub struct StkPushRequest {
    /// MSISDN in `254XXXXXXXXX` format.
    pub phone_number: String,
    pub amount: Decimal,
    /// Shown on the customer's statement; we use the order id.
    pub account_reference: String,
    pub description: String,
}

/// The gateway's acknowledgement of an STK push. The checkout request id
/// is the key the asynchronous callback is later matched on.
#[derive(Debug, Clone)]
pub struct StkPushResponse {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: String,
}

/// Seam between the payment reconciler and the mobile-money provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn stk_push(&self, request: &StkPushRequest) -> Result<StkPushResponse, GatewayError>;
}

/// Daraja gateway configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct DarajaConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub shortcode: String,
    pub passkey: String,
    pub callback_url: String,
}

impl DarajaConfig {
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            base_url: std::env::var("MPESA_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.safaricom.co.ke".to_string()),
            consumer_key: std::env::var("MPESA_CONSUMER_KEY")?,
            consumer_secret: std::env::var("MPESA_CONSUMER_SECRET")?,
            shortcode: std::env::var("MPESA_SHORTCODE")?,
            passkey: std::env::var("MPESA_PASSKEY")?,
            callback_url: std::env::var("MPESA_CALLBACK_URL")?,
        })
    }
}

/// Production gateway talking to the Safaricom Daraja API.
pub struct DarajaGateway {
    http: reqwest::Client,
    config: DarajaConfig,
}

#[derive(Debug, Deserialize)]
struct OAuthResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DarajaStkResponse {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
    #[serde(rename = "ResponseCode")]
    response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    customer_message: Option<String>,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

impl DarajaGateway {
    pub fn new(config: DarajaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Client-credentials token for the Daraja API.
    async fn access_token(&self) -> Result<String, GatewayError> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: OAuthResponse = response.json().await?;
        Ok(body.access_token)
    }
}

#[async_trait]
impl PaymentGateway for DarajaGateway {
    async fn stk_push(&self, request: &StkPushRequest) -> Result<StkPushResponse, GatewayError> {
        let token = self.access_token().await?;

        let now = Utc::now();
        let timestamp = daraja_timestamp(now);
        let password = stk_password(&self.config.shortcode, &self.config.passkey, &timestamp);

        // Daraja takes whole shillings.
        let amount = request
            .amount
            .round()
            .to_u64()
            .ok_or(GatewayError::InvalidAmount(request.amount))?;

        let url = format!(
            "{}/mpesa/stkpush/v1/processrequest",
            self.config.base_url
        );

        let body = json!({
            "BusinessShortCode": self.config.shortcode,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount,
            "PartyA": request.phone_number,
            "PartyB": self.config.shortcode,
            "PhoneNumber": request.phone_number,
            "CallBackURL": self.config.callback_url,
            "AccountReference": request.account_reference,
            "TransactionDesc": request.description,
        });

        let response: DarajaStkResponse = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (
            response.response_code.as_deref(),
            response.checkout_request_id,
        ) {
            (Some("0"), Some(checkout_request_id)) => Ok(StkPushResponse {
                merchant_request_id: response.merchant_request_id.unwrap_or_default(),
                checkout_request_id,
                customer_message: response.customer_message.unwrap_or_default(),
            }),
            _ => Err(GatewayError::Rejected {
                code: response
                    .error_code
                    .or(response.response_code)
                    .unwrap_or_else(|| "unknown".to_string()),
                description: response
                    .error_message
                    .or(response.response_description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

/// Daraja timestamp format: YYYYMMDDHHmmss.
pub fn daraja_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// STK push password: base64(shortcode + passkey + timestamp).
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_daraja_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 1, 13, 5, 9).unwrap();
        assert_eq!(daraja_timestamp(ts), "20240901130509");
    }

    #[test]
    fn test_stk_password_is_base64_of_concatenation() {
        let password = stk_password("174379", "passkey", "20240901130509");
        let decoded = BASE64.decode(password).unwrap();
        assert_eq!(decoded, b"174379passkey20240901130509");
    }

    #[test]
    fn test_amount_conversion_rounds_to_whole_shillings() {
        assert_eq!(dec!(159.50).round().to_u64(), Some(160));
        assert_eq!(dec!(160.00).round().to_u64(), Some(160));
        assert_eq!(dec!(-1).round().to_u64(), None);
    }
}
