//! Checkout promotional code state.
//!
//! Tracks one code through `None → Validating → Valid | Invalid` and computes the
//! discounted price shown at checkout. The backend remains the authority on the
//! amount actually charged; the figure computed here is for display only.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    api::{CouponValidation, DiscountType},
    error::{ClientError, Result},
};

/// Shown when validation is requested for a blank code.
pub const EMPTY_CODE_MESSAGE: &str = "Please enter a promotional code";
/// Shown when the backend rejects a code without saying why.
pub const INVALID_CODE_MESSAGE: &str = "Invalid promotional code";
/// Shown when the validation request itself fails.
pub const VALIDATION_FAILED_MESSAGE: &str = "Failed to validate promotional code";

/// Validation status of the code being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoStatus {
    /// Not validated.
    #[default]
    None,
    /// Validation request in flight.
    Validating,
    /// Backend accepted the code.
    Valid,
    /// Backend rejected the code, or validation failed.
    Invalid,
}

/// Promotional code state for one checkout.
#[derive(Debug, Clone, Default)]
pub struct PromoState {
    input: String,
    status: PromoStatus,
    discount: Option<CouponValidation>,
    validated_code: Option<String>,
    error: Option<String>,
}

impl PromoState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the code as typed.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the validation status.
    #[must_use]
    pub fn status(&self) -> PromoStatus {
        self.status
    }

    /// Returns the accepted discount, if any.
    #[must_use]
    pub fn discount(&self) -> Option<&CouponValidation> {
        self.discount.as_ref()
    }

    /// Returns the last error message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replaces the typed code.
    ///
    /// Any code other than the one last validated drops the status and discount.
    pub fn edit(&mut self, code: impl Into<String>) {
        self.input = code.into();
        if self.validated_code.as_deref() != Some(self.input.as_str()) {
            self.status = PromoStatus::None;
            self.discount = None;
        }
    }

    /// Starts validating the typed code and returns the code to send.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidInput`] if the code is blank; the error message is also
    ///   recorded in the state
    /// - [`ClientError::RequestInFlight`] if a validation is already running
    pub fn begin_validation(&mut self) -> Result<String> {
        if self.status == PromoStatus::Validating {
            return Err(ClientError::RequestInFlight);
        }
        if self.input.trim().is_empty() {
            self.error = Some(EMPTY_CODE_MESSAGE.to_owned());
            return Err(ClientError::InvalidInput(EMPTY_CODE_MESSAGE.to_owned()));
        }

        self.status = PromoStatus::Validating;
        self.error = None;
        Ok(self.input.clone())
    }

    /// Applies the outcome of a validation request.
    pub fn apply_result(&mut self, result: Result<CouponValidation>) {
        match result {
            Ok(coupon) if coupon.valid => {
                debug!(display_text = ?coupon.display_text, "promotional code accepted");
                self.status = PromoStatus::Valid;
                self.validated_code = Some(self.input.clone());
                self.discount = Some(coupon);
                self.error = None;
            }
            Ok(coupon) => {
                self.reject(coupon.message.unwrap_or_else(|| INVALID_CODE_MESSAGE.to_owned()));
            }
            Err(e) => {
                warn!(error = %e, "promotional code validation failed");
                self.reject(VALIDATION_FAILED_MESSAGE.to_owned());
            }
        }
    }

    fn reject(&mut self, message: String) {
        self.status = PromoStatus::Invalid;
        self.discount = None;
        self.validated_code = None;
        self.error = Some(message);
    }

    /// Returns the code to submit with the payment, only while it is valid.
    #[must_use]
    pub fn code_for_submission(&self) -> Option<&str> {
        match self.status {
            PromoStatus::Valid => self.validated_code.as_deref(),
            _ => None,
        }
    }

    /// Returns `price` after the accepted discount, or `price` unchanged.
    #[must_use]
    pub fn discounted_price(&self, price: Decimal) -> Decimal {
        self.discount.as_ref().map_or(price, |coupon| apply_discount(price, coupon))
    }
}

/// Applies a coupon to a price.
///
/// - `percent`: `price * (1 - value / 100)`
/// - `amount`: `price - value / 100`, the value being in cents
///
/// The result is never negative. A zero price, a missing value or an unknown
/// discount type leaves the price unchanged.
///
/// # Examples
///
/// ```
/// use membership_client::{
///     api::{CouponValidation, DiscountType},
///     subscription::apply_discount,
/// };
/// use rust_decimal::Decimal;
///
/// let coupon = CouponValidation {
///     valid: true,
///     discount_type: Some(DiscountType::Amount),
///     discount_value: Some(Decimal::from(250)),
///     display_text: Some("$2.50 off".to_owned()),
///     message: None,
/// };
/// assert_eq!(apply_discount(Decimal::from(9), &coupon), Decimal::new(650, 2));
/// ```
#[must_use]
pub fn apply_discount(price: Decimal, coupon: &CouponValidation) -> Decimal {
    if price.is_zero() {
        return price;
    }
    let Some(value) = coupon.discount_value else {
        return price;
    };

    let discounted = match coupon.discount_type {
        Some(DiscountType::Percent) => price * (Decimal::ONE - value / Decimal::ONE_HUNDRED),
        Some(DiscountType::Amount) => price - value / Decimal::ONE_HUNDRED,
        Some(DiscountType::Unknown) | None => price,
    };
    discounted.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(kind: DiscountType, value: i64) -> CouponValidation {
        CouponValidation {
            valid: true,
            discount_type: Some(kind),
            discount_value: Some(Decimal::from(value)),
            display_text: Some("deal".to_owned()),
            message: None,
        }
    }

    #[test]
    fn test_blank_code_rejected_locally() {
        let mut promo = PromoState::new();
        promo.edit("   ");
        let err = promo.begin_validation().unwrap_err();
        assert_eq!(err.to_string(), "Please enter a promotional code");
        assert_eq!(promo.error(), Some("Please enter a promotional code"));
        assert_eq!(promo.status(), PromoStatus::None);
    }

    #[test]
    fn test_valid_code() {
        let mut promo = PromoState::new();
        promo.edit("SAVE20");
        assert_eq!(promo.begin_validation().unwrap(), "SAVE20");
        assert_eq!(promo.status(), PromoStatus::Validating);
        assert!(promo.code_for_submission().is_none());

        promo.apply_result(Ok(coupon(DiscountType::Percent, 20)));
        assert_eq!(promo.status(), PromoStatus::Valid);
        assert_eq!(promo.code_for_submission(), Some("SAVE20"));
        assert_eq!(promo.discounted_price(Decimal::from(19)), Decimal::new(1520, 2));
    }

    #[test]
    fn test_double_validation_rejected() {
        let mut promo = PromoState::new();
        promo.edit("SAVE20");
        promo.begin_validation().unwrap();
        assert!(matches!(promo.begin_validation(), Err(ClientError::RequestInFlight)));
    }

    #[test]
    fn test_invalid_code_uses_server_message_verbatim() {
        let mut promo = PromoState::new();
        promo.edit("OLD");
        promo.begin_validation().unwrap();
        promo.apply_result(Ok(CouponValidation {
            valid: false,
            discount_type: None,
            discount_value: None,
            display_text: None,
            message: Some("expired".to_owned()),
        }));

        assert_eq!(promo.status(), PromoStatus::Invalid);
        assert!(promo.discount().is_none());
        assert_eq!(promo.error(), Some("expired"));
        assert_eq!(promo.discounted_price(Decimal::from(9)), Decimal::from(9));
    }

    #[test]
    fn test_invalid_code_default_message() {
        let mut promo = PromoState::new();
        promo.edit("NOPE");
        promo.begin_validation().unwrap();
        promo.apply_result(Ok(CouponValidation {
            valid: false,
            discount_type: None,
            discount_value: None,
            display_text: None,
            message: None,
        }));
        assert_eq!(promo.error(), Some("Invalid promotional code"));
    }

    #[test]
    fn test_transport_failure() {
        let mut promo = PromoState::new();
        promo.edit("SAVE20");
        promo.begin_validation().unwrap();
        promo.apply_result(Err(ClientError::Status { status: 500, message: "boom".to_owned() }));
        assert_eq!(promo.status(), PromoStatus::Invalid);
        assert_eq!(promo.error(), Some("Failed to validate promotional code"));
    }

    #[test]
    fn test_edit_resets_validated_discount() {
        let mut promo = PromoState::new();
        promo.edit("SAVE20");
        promo.begin_validation().unwrap();
        promo.apply_result(Ok(coupon(DiscountType::Percent, 20)));

        promo.edit("SAVE20");
        assert_eq!(promo.status(), PromoStatus::Valid);

        promo.edit("SAVE2");
        assert_eq!(promo.status(), PromoStatus::None);
        assert!(promo.discount().is_none());
        assert!(promo.code_for_submission().is_none());
    }

    #[test]
    fn test_apply_discount_amount_in_cents() {
        let result = apply_discount(Decimal::from(19), &coupon(DiscountType::Amount, 500));
        assert_eq!(result, Decimal::from(14));
    }

    #[test]
    fn test_apply_discount_clamped_at_zero() {
        assert_eq!(
            apply_discount(Decimal::from(9), &coupon(DiscountType::Amount, 5000)),
            Decimal::ZERO
        );
        assert_eq!(
            apply_discount(Decimal::from(9), &coupon(DiscountType::Percent, 150)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_apply_discount_zero_price_unchanged() {
        let result = apply_discount(Decimal::ZERO, &coupon(DiscountType::Amount, 500));
        assert_eq!(result, Decimal::ZERO);
    }

    #[test]
    fn test_apply_discount_unknown_type() {
        let result = apply_discount(Decimal::from(9), &coupon(DiscountType::Unknown, 50));
        assert_eq!(result, Decimal::from(9));
    }
}
