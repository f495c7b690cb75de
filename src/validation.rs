// Validation utilities shared across request DTOs.

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates that a price is not negative.
pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        Err(ValidationError::new("price_must_not_be_negative"))
    } else {
        Ok(())
    }
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Safaricom MSISDN in international format without the plus sign,
    // e.g. 254712345678 or 254110123456.
    RE.get_or_init(|| Regex::new(r"^254(7\d{8}|1\d{8})$").unwrap())
}

/// Validates an M-Pesa phone number (`254XXXXXXXXX`).
pub fn validate_mpesa_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_mpesa_phone"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_negative_price_rejected() {
        assert!(validate_price(&dec!(-0.01)).is_err());
        assert!(validate_price(&dec!(0)).is_ok());
        assert!(validate_price(&dec!(150.50)).is_ok());
    }

    #[test]
    fn test_valid_mpesa_phones() {
        assert!(validate_mpesa_phone("254712345678").is_ok());
        assert!(validate_mpesa_phone("254110123456").is_ok());
    }

    #[test]
    fn test_invalid_mpesa_phones() {
        assert!(validate_mpesa_phone("0712345678").is_err());
        assert!(validate_mpesa_phone("+254712345678").is_err());
        assert!(validate_mpesa_phone("25471234567").is_err());
        assert!(validate_mpesa_phone("2547123456789").is_err());
        assert!(validate_mpesa_phone("254812345678").is_err());
    }
}
