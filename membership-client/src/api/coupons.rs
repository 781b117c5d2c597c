//! Promotional code validation.

use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{endpoints, http::ApiClient};
use crate::error::{ClientError, Result};

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage off, `0..=100`.
    Percent,
    /// Fixed amount off, in cents.
    Amount,
    /// Unrecognised type; applies no discount.
    #[serde(other)]
    Unknown,
}

/// Backend answer for a promotional code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponValidation {
    /// Whether the code can be applied.
    #[serde(default)]
    pub valid: bool,
    /// Discount kind.
    #[serde(default)]
    pub discount_type: Option<DiscountType>,
    /// Percentage or amount in cents, depending on `discount_type`.
    #[serde(default)]
    pub discount_value: Option<Decimal>,
    /// Human-readable discount, e.g. `"20% off"`.
    #[serde(default)]
    pub display_text: Option<String>,
    /// Explanation when the code is not valid.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize)]
struct CouponRequest<'a> {
    promo_code: &'a str,
}

impl ApiClient {
    /// Validates a promotional code.
    ///
    /// No bearer credential is sent.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed body. An unusable code is
    /// reported through [`CouponValidation::valid`].
    #[instrument(skip(self))]
    pub async fn validate_coupon(&self, promo_code: &str) -> Result<CouponValidation> {
        info!("validating promotional code");
        let value = self
            .request_json(
                Method::POST,
                endpoints::VALIDATE_COUPON,
                None,
                Some(&CouponRequest { promo_code }),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::InvalidResponse(format!("Unexpected coupon response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_percent_coupon() {
        let coupon: CouponValidation = serde_json::from_value(json!({
            "valid": true,
            "discount_type": "percent",
            "discount_value": 20,
            "display_text": "20% off"
        }))
        .unwrap();

        assert!(coupon.valid);
        assert_eq!(coupon.discount_type, Some(DiscountType::Percent));
        assert_eq!(coupon.discount_value, Some(Decimal::from(20)));
    }

    #[test]
    fn test_decode_invalid_coupon() {
        let coupon: CouponValidation =
            serde_json::from_value(json!({"valid": false, "message": "expired"})).unwrap();
        assert!(!coupon.valid);
        assert_eq!(coupon.message.as_deref(), Some("expired"));
        assert!(coupon.discount_type.is_none());
    }

    #[test]
    fn test_decode_unknown_discount_type() {
        let coupon: CouponValidation =
            serde_json::from_value(json!({"valid": true, "discount_type": "bogo"})).unwrap();
        assert_eq!(coupon.discount_type, Some(DiscountType::Unknown));
    }
}
