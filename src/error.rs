//! Gateway error taxonomy.
//!
//! Every failure propagates to the caller; the gateway never retries on its
//! own. `is_retryable` tells the checkout pipeline whether prompting the
//! customer to try again could help.

use crate::store::StoreError;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Caller-supplied data failed a structural check.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The return callback named a different order than the one it was
    /// processed against. Forged or cross-order callback; hard stop.
    #[error("abuse of transaction callback: callback carried order id {callback_order_id}, expected {order_id}")]
    Security {
        order_id: String,
        callback_order_id: String,
    },

    /// No pending payment matches the callback. Also the outcome of a
    /// duplicate callback delivery after the record already went terminal.
    #[error("no pending payment with remote id {remote_id} and order id {order_id}")]
    PaymentNotFound { remote_id: String, order_id: String },

    /// More than one authorization-state record matched the lookup key.
    /// The store invariant is broken; never silently pick one.
    #[error("{count} pending payments share remote id {remote_id} and order id {order_id}, expected exactly one")]
    StoreIntegrity {
        remote_id: String,
        order_id: String,
        count: usize,
    },

    /// The processor explicitly reported a non-success status for the
    /// transaction. A legitimate business outcome, not a bug; the record is
    /// durably marked failed before this is raised.
    #[error("payment failed with status code {status}")]
    PaymentFailed { status: i64 },

    /// The processor's HTTP API failed, or returned a body that does not
    /// decode. For 4xx responses the structured `error_code` and
    /// `error_message` are carried when the body had them.
    #[error("processor request to {url} failed: {message}")]
    Upstream {
        url: String,
        http_status: Option<u16>,
        error_code: Option<i64>,
        error_message: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Upstream { http_status, .. } => match http_status {
                Some(code) => *code >= 500,
                None => true,
            },
            GatewayError::Store(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Processor-supplied message fit for the user-facing error channel.
    /// Present only when a 4xx response carried a structured error body.
    pub fn upstream_user_message(&self) -> Option<&str> {
        match self {
            GatewayError::Upstream {
                http_status: Some(code),
                error_message: Some(message),
                ..
            } if (400..500).contains(code) => Some(message.as_str()),
            _ => None,
        }
    }
}
