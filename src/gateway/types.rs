//! Shared gateway types: order context, money, payment states and the
//! untrusted callback payload.

use crate::error::{GatewayError, GatewayResult};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unofficial currency code for the Iranian Toman. The processor settles in
/// Rial only, so Toman totals are converted before being sent upstream.
pub const TOMAN_CODE: &str = "TMN";

/// A decimal amount plus its currency code, as the order pipeline hands it
/// over. The amount stays a string until a concrete integer is needed for
/// the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl Money {
    pub fn new(amount: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency: currency.into(),
        }
    }

    pub fn validate_positive(&self, field: &str) -> GatewayResult<()> {
        let parsed =
            BigDecimal::from_str(&self.amount).map_err(|_| GatewayError::Validation {
                message: format!("invalid decimal amount: {}", self.amount),
                field: Some(field.to_string()),
            })?;
        if parsed <= BigDecimal::from(0) {
            return Err(GatewayError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some(field.to_string()),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        Ok(())
    }

    /// Integer amount in the unit the processor accepts. Toman (`TMN`)
    /// totals are multiplied by 10 because the processor only takes the
    /// official Rial code; every other currency passes through unchanged.
    /// This is a fixed business rule, not a configuration knob.
    pub fn payable_amount(&self) -> GatewayResult<i64> {
        let parsed =
            BigDecimal::from_str(&self.amount).map_err(|_| GatewayError::Validation {
                message: format!("invalid decimal amount: {}", self.amount),
                field: Some("amount".to_string()),
            })?;
        let units = parsed
            .with_scale_round(0, RoundingMode::Down)
            .to_i64()
            .ok_or_else(|| GatewayError::Validation {
                message: format!("amount out of integer range: {}", self.amount),
                field: Some("amount".to_string()),
            })?;
        if self.currency == TOMAN_CODE {
            units.checked_mul(10).ok_or_else(|| GatewayError::Validation {
                message: format!("amount out of range after rial conversion: {}", self.amount),
                field: Some("amount".to_string()),
            })
        } else {
            Ok(units)
        }
    }
}

/// State of a payment record. Transitions are one-directional:
/// `authorization` moves to `completed` or `failed`, both terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Authorization,
    Completed,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Authorization => "authorization",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentState::Authorization)
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "authorization" => Ok(PaymentState::Authorization),
            "completed" => Ok(PaymentState::Completed),
            "failed" => Ok(PaymentState::Failed),
            other => Err(GatewayError::Validation {
                message: format!("unknown payment state: {}", other),
                field: Some("state".to_string()),
            }),
        }
    }
}

/// The slice of the order the gateway needs: its id, total, and the
/// per-order unguessable key embedded in the return URL.
#[derive(Debug, Clone)]
pub struct OrderContext {
    pub order_id: String,
    pub total: Money,
    pub redirect_key: String,
}

/// Raw parameters carried back by the customer's browser redirect. None of
/// these are trusted for the completion decision; `order_id` feeds the
/// identity cross-check and the rest exist for logging.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub track_id: Option<String>,
    pub id: String,
    pub order_id: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMethod {
    Post,
    Get,
}

/// Off-site destination the checkout pipeline should send the customer to.
/// The processor expects the redirect submitted as a POST form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub url: String,
    pub method: RedirectMethod,
}

impl RedirectTarget {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RedirectMethod::Post,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rial_amount_passes_through_unchanged() {
        let total = Money::new("100000", "IRR");
        assert_eq!(total.payable_amount().expect("conversion should succeed"), 100000);
    }

    #[test]
    fn toman_amount_is_multiplied_by_ten() {
        let total = Money::new("5000", "TMN");
        assert_eq!(total.payable_amount().expect("conversion should succeed"), 50000);
    }

    #[test]
    fn fractional_amount_is_truncated_before_conversion() {
        let total = Money::new("5000.75", "TMN");
        assert_eq!(total.payable_amount().expect("conversion should succeed"), 50000);
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let total = Money::new("abc", "IRR");
        assert!(matches!(
            total.payable_amount(),
            Err(GatewayError::Validation { .. })
        ));
    }

    #[test]
    fn validate_positive_rejects_zero_and_missing_currency() {
        assert!(Money::new("0", "IRR").validate_positive("total").is_err());
        assert!(Money::new("100", " ").validate_positive("total").is_err());
        assert!(Money::new("100", "IRR").validate_positive("total").is_ok());
    }

    #[test]
    fn payment_state_round_trips_through_str() {
        for state in [
            PaymentState::Authorization,
            PaymentState::Completed,
            PaymentState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<PaymentState>().unwrap(), state);
        }
        assert!("pending".parse::<PaymentState>().is_err());
    }

    #[test]
    fn terminal_states_are_flagged() {
        assert!(!PaymentState::Authorization.is_terminal());
        assert!(PaymentState::Completed.is_terminal());
        assert!(PaymentState::Failed.is_terminal());
    }

    #[test]
    fn callback_params_deserialize_with_missing_optional_fields() {
        let params: CallbackParams = serde_json::from_value(serde_json::json!({
            "id": "rem_1",
            "order_id": "42"
        }))
        .expect("deserialization should succeed");
        assert_eq!(params.id, "rem_1");
        assert_eq!(params.order_id, "42");
        assert!(params.status.is_none());
        assert!(params.track_id.is_none());
    }
}
